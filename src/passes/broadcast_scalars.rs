//! Broadcast scalar operands of mixed scalar/vector arithmetic.
//!
//! GLSL splats a scalar operand implicitly; not every target does. Where the
//! target requires matching shapes, the scalar side of a mixed expression is
//! wrapped in a fill constructor:
//!
//! ```text
//! v + s   ->   v + vec3(s)
//! ```
//!
//! Matrices have no fill constructor (`mat3(s)` is diagonal), so the scalar
//! side of a mixed addition or subtraction goes through a synthesized fill
//! helper instead. Scalar multiply and divide against a matrix scale every
//! element natively on all targets and stay untouched.

use std::collections::HashMap;

use log::debug;

use crate::ast::{build, BinaryOp, FunctionId, Node, NodeKind, ParamDirection, Qualifier, Type};
use crate::context::Context;
use crate::error::Result;
use crate::traverse::{apply, traverse, Traverse, Traverser, ValidateOptions, VisitPhase, Visitor};

/// Which mixed shapes the requested target cannot express
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastRules {
    /// Splat scalars mixed with vector operands
    pub vectors: bool,
    /// Splat scalars added to or subtracted from matrix operands
    pub matrices: bool,
}

struct BroadcastScalars {
    rules: BroadcastRules,
    /// Fill helpers already synthesized, keyed by matrix shape
    fill_helpers: HashMap<(u8, u8), FunctionId>,
}

impl BroadcastScalars {
    /// Function filling every element of a `cols`x`rows` matrix with one
    /// scalar, synthesized once per shape
    fn fill_helper(&mut self, t: &mut Traverser, cols: u8, rows: u8, element: Type) -> FunctionId {
        if let Some(id) = self.fill_helpers.get(&(cols, rows)) {
            return *id;
        }

        let matrix = Type::matrix(cols, rows);
        let param = t
            .ctx
            .internal_param("value", element.clone(), ParamDirection::In);
        let value = param.var;
        let helper = t.ctx.helper_function("fill", matrix.clone(), vec![param]);

        let column_type = Type::vector(element.basic, rows);
        let columns: Vec<Node> = (0..cols)
            .map(|_| {
                let s = build::symbol(t.ctx, value);
                build::construct(t.ctx, column_type.clone(), vec![s])
            })
            .collect();
        let filled = build::construct(t.ctx, matrix, columns);
        let ret = build::ret(t.ctx, Some(filled));
        let body = build::block(t.ctx, vec![ret]);
        let definition = build::function_definition(t.ctx, helper, body);
        t.insert_at_top_level(vec![definition], Vec::new());

        debug!(
            "synthesized matrix fill helper {}",
            t.ctx.functions.get(helper).name
        );

        self.fill_helpers.insert((cols, rows), helper);
        helper
    }

    fn broadcast_into_vector(&mut self, t: &mut Traverser, parent: &Node, scalar: &Node, shape: Type) {
        let target = shape.with_qualifier(Qualifier::Temporary);
        t.queue_wrap(
            parent.id,
            scalar.id,
            Box::new(move |old, ctx| build::construct(ctx, target, vec![old])),
        );
    }

    fn broadcast_into_matrix(&mut self, t: &mut Traverser, parent: &Node, scalar: &Node, shape: &Type) {
        let helper = self.fill_helper(
            t,
            shape.secondary_size,
            shape.primary_size,
            scalar.ty.clone().with_qualifier(Qualifier::Temporary),
        );
        t.queue_wrap(
            parent.id,
            scalar.id,
            Box::new(move |old, ctx| build::call(ctx, helper, vec![old])),
        );
    }
}

impl Visitor for BroadcastScalars {
    fn visit_binary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase != VisitPhase::Pre {
            return Traverse::Children;
        }

        let (op, left, right) = match &node.kind {
            NodeKind::Binary { op, left, right } => (*op, left, right),
            _ => return Traverse::Children,
        };

        // Compound assignments splat only the value side; the base operator
        // decides whether the shape mix is allowed.
        let base = match op.compound_base() {
            Some(base) => base,
            None if op.is_arithmetic() => op,
            None => return Traverse::Children,
        };

        let (scalar, other) = if left.ty.is_scalar() && !right.ty.is_scalar() {
            if op.is_assignment() {
                return Traverse::Children;
            }
            (left, right)
        } else if right.ty.is_scalar() && !left.ty.is_scalar() {
            (right, left)
        } else {
            return Traverse::Children;
        };

        if self.rules.vectors && other.ty.is_vector() {
            self.broadcast_into_vector(t, node, scalar, other.ty.clone());
        } else if self.rules.matrices
            && other.ty.is_matrix()
            && matches!(base, BinaryOp::Add | BinaryOp::Sub)
        {
            let shape = other.ty.clone();
            self.broadcast_into_matrix(t, node, scalar, &shape);
        }

        Traverse::Children
    }
}

/// Splat scalar operands of mixed-shape arithmetic per the target's rules
pub fn broadcast_scalars(root: &mut Node, ctx: &mut Context, rules: BroadcastRules) -> Result<()> {
    if !rules.vectors && !rules.matrices {
        return Ok(());
    }

    let mut visitor = BroadcastScalars {
        rules,
        fill_helpers: HashMap::new(),
    };
    let mut t = Traverser::new(ctx);
    traverse(root, &mut visitor, &mut t);
    let edits = t.finish()?;
    apply(root, edits, ctx)?;

    crate::traverse::validate(root, ctx, &ValidateOptions::default())
}
