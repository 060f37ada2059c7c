//! Extract untranslatable expressions into synthesized helper functions.
//!
//! Targets without a ternary expression or a sequence (comma) operator get
//! each such construct replaced by a call to a helper whose body reproduces
//! the construct with ordinary statements. Only the outermost occurrence is
//! extracted per iteration; the pass runs to a fixed point so constructs
//! nested inside an extracted one are caught once they reappear in a helper
//! body.
//!
//! The helper receives the enclosing function's own parameters unchanged so
//! the copied expression keeps referencing the same variables, plus every
//! captured local as an extra parameter (written locals are passed inout).

use std::collections::BTreeMap;

use log::debug;

use crate::ast::{
    build, BasicType, BinaryOp, Node, NodeKind, ParamDirection, Parameter, Qualifier, SymbolKind,
    VariableId,
};
use crate::context::Context;
use crate::error::Result;
use crate::traverse::{
    run_to_fixed_point, traverse, Traverse, Traverser, ValidateOptions, VisitPhase, Visitor,
};

use super::collect_references;

/// Which constructs the requested target cannot express
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractKinds {
    pub ternaries: bool,
    pub commas: bool,
}

struct ExtractVisitor {
    kinds: ExtractKinds,
}

impl ExtractVisitor {
    /// Build the helper function for `construct` and queue the call
    /// replacement and the top-level helper insertion.
    fn extract(&mut self, t: &mut Traverser, construct: &Node) -> Traverse {
        let function = match t.current_function() {
            Some(f) => f,
            // Constructs outside any function body (global initializers)
            // stay; the emitters diagnose them if they survive this far.
            None => return Traverse::Children,
        };

        let parent = match t.parent() {
            Some(p) => p,
            None => return Traverse::Children,
        };

        // Forward the enclosing function's parameters unchanged.
        let own_params: Vec<Parameter> = t.ctx.functions.get(function).parameters.clone();
        let own_vars: Vec<VariableId> = own_params.iter().map(|p| p.var).collect();

        // Capture referenced locals as extra parameters; written locals are
        // passed inout so the write stays observable in the caller.
        let mut reads = BTreeMap::new();
        let mut writes = BTreeMap::new();
        collect_references(construct, t.ctx, false, &mut reads, &mut writes);

        let mut captured: Vec<Parameter> = Vec::new();
        for var in reads.keys() {
            let record = t.ctx.variables.get(*var);
            let is_local = matches!(record.ty.qualifier, Qualifier::Temporary)
                && record.kind != SymbolKind::BuiltIn;
            if is_local && !own_vars.contains(var) {
                captured.push(Parameter {
                    var: *var,
                    direction: if writes.contains_key(var) {
                        ParamDirection::InOut
                    } else {
                        ParamDirection::In
                    },
                });
            }
        }

        let mut params = own_params;
        params.extend(captured.iter().cloned());

        // Helper body reproducing the construct with plain statements.
        let return_type = construct.ty.clone().with_qualifier(Qualifier::Temporary);
        let body = match &construct.kind {
            NodeKind::Ternary {
                condition,
                true_expr,
                false_expr,
            } => {
                let cond = condition.deep_copy(t.ctx);
                let then_value = true_expr.deep_copy(t.ctx);
                let else_value = false_expr.deep_copy(t.ctx);

                let then_ret = build::ret(t.ctx, Some(then_value));
                let else_ret = build::ret(t.ctx, Some(else_value));
                let then_block = build::block(t.ctx, vec![then_ret]);
                let else_block = build::block(t.ctx, vec![else_ret]);
                let if_stmt = build::if_stmt(t.ctx, cond, then_block, Some(else_block));
                build::block(t.ctx, vec![if_stmt])
            }
            NodeKind::Binary {
                op: BinaryOp::Comma,
                left,
                right,
            } => {
                let first = left.deep_copy(t.ctx);
                let second = right.deep_copy(t.ctx);

                if return_type.basic == BasicType::Void {
                    build::block(t.ctx, vec![first, second])
                } else {
                    let ret = build::ret(t.ctx, Some(second));
                    build::block(t.ctx, vec![first, ret])
                }
            }
            _ => return Traverse::Children,
        };

        let helper = t
            .ctx
            .helper_function("expr", return_type, params.clone());
        debug!(
            "extracting construct into helper {}",
            t.ctx.functions.get(helper).name
        );

        let definition = build::function_definition(t.ctx, helper, body);

        // Call the helper with the forwarded parameters and captures.
        let args: Vec<Node> = params
            .iter()
            .map(|p| build::symbol(t.ctx, p.var))
            .collect();
        let call = build::call(t.ctx, helper, args);

        t.queue_replacement(parent, construct.id, call);
        t.insert_at_top_level(vec![definition], Vec::new());

        // Inner constructs are caught on the next fixed-point iteration,
        // after the outer one is gone.
        Traverse::Skip
    }
}

impl Visitor for ExtractVisitor {
    fn visit_ternary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase == VisitPhase::Pre && self.kinds.ternaries {
            return self.extract(t, node);
        }
        Traverse::Children
    }

    fn visit_binary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase == VisitPhase::Pre && self.kinds.commas {
            if let NodeKind::Binary {
                op: BinaryOp::Comma,
                ..
            } = &node.kind
            {
                return self.extract(t, node);
            }
        }
        Traverse::Children
    }
}

/// Replace every ternary/comma expression with a call to a synthesized
/// helper, iterating until none remain
pub fn extract_expressions(root: &mut Node, ctx: &mut Context, kinds: ExtractKinds) -> Result<()> {
    if !kinds.ternaries && !kinds.commas {
        return Ok(());
    }

    run_to_fixed_point(root, ctx, "extract_expressions", |root, ctx| {
        let mut visitor = ExtractVisitor { kinds };
        let mut t = Traverser::new(ctx);
        traverse(root, &mut visitor, &mut t);
        t.finish()
    })?;

    crate::traverse::validate(root, ctx, &ValidateOptions::default())
}
