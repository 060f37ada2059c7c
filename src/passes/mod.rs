//! Transformation pass library.
//!
//! Every pass follows the same contract: traverse the tree read-only, queue
//! edits, apply them, validate the result. On failure the tree is left
//! non-corrupt but unspecified and the translation aborts; no pass applies
//! partially and continues.

mod broadcast_scalars;
mod chunk_loops;
mod extract_expressions;
mod gather_uniforms;
mod materialize_params;
mod prune_no_ops;
mod rewrite_out_parameters;
mod separate_declarations;
mod split_swizzles;

pub use broadcast_scalars::{broadcast_scalars, BroadcastRules};
pub use chunk_loops::chunk_loops;
pub use extract_expressions::{extract_expressions, ExtractKinds};
pub use gather_uniforms::gather_uniforms;
pub use materialize_params::materialize_params;
pub use prune_no_ops::prune_no_ops;
pub use rewrite_out_parameters::rewrite_out_parameters;
pub use separate_declarations::separate_declarations;
pub use split_swizzles::split_swizzles;

use std::collections::BTreeMap;

use crate::ast::{build, BinaryOp, CallTarget, Node, NodeKind, VariableId};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::traverse::Traverser;

/// Assert the single-declarator shape established by
/// [separate_declarations]; passes that rely on it call this on every
/// declaration they touch.
pub(crate) fn expect_single_declarator(node: &Node) -> Result<&Node> {
    match &node.kind {
        NodeKind::Declaration { declarators } if declarators.len() == 1 => Ok(&declarators[0]),
        NodeKind::Declaration { declarators } => Err(Error::MultipleDeclarators {
            count: declarators.len(),
        }),
        _ => Err(Error::Internal(format!(
            "expected a declaration, found node {:?}",
            node.id
        ))),
    }
}

/// The declared variable of a single declarator, with or without initializer
pub(crate) fn declared_variable(declarator: &Node) -> Option<crate::ast::VariableId> {
    match &declarator.kind {
        NodeKind::Symbol(var) => Some(*var),
        NodeKind::Binary {
            op: BinaryOp::Initialize,
            left,
            ..
        } => match &left.kind {
            NodeKind::Symbol(var) => Some(*var),
            _ => None,
        },
        _ => None,
    }
}

/// Variables referenced by a subtree, split into reads and writes.
///
/// The write set follows the same l-value rules as the traverser: assignment
/// targets, increment/decrement operands and arguments bound to out
/// parameters.
pub(crate) fn collect_references(
    node: &Node,
    ctx: &Context,
    in_lvalue: bool,
    reads: &mut BTreeMap<VariableId, ()>,
    writes: &mut BTreeMap<VariableId, ()>,
) {
    match &node.kind {
        NodeKind::Symbol(var) => {
            reads.insert(*var, ());
            if in_lvalue {
                writes.insert(*var, ());
            }
        }
        NodeKind::Unary { op, operand } => {
            collect_references(operand, ctx, op.requires_lvalue(), reads, writes);
        }
        NodeKind::Binary { op, left, right } => {
            let left_lvalue = match op {
                op if op.is_assignment() => true,
                BinaryOp::Index | BinaryOp::IndexStruct => in_lvalue,
                _ => false,
            };
            collect_references(left, ctx, left_lvalue, reads, writes);
            collect_references(right, ctx, false, reads, writes);
        }
        NodeKind::Swizzle { operand, .. } => {
            collect_references(operand, ctx, in_lvalue, reads, writes);
        }
        NodeKind::Call { target, args } => {
            let out_params: Vec<bool> = match target {
                CallTarget::Function(f) => ctx
                    .functions
                    .get(*f)
                    .parameters
                    .iter()
                    .map(|p| p.direction.is_output())
                    .collect(),
                _ => Vec::new(),
            };
            for (i, arg) in args.iter().enumerate() {
                let is_out = out_params.get(i).copied().unwrap_or(false);
                collect_references(arg, ctx, is_out, reads, writes);
            }
        }
        _ => {
            for child in node.children() {
                collect_references(child, ctx, false, reads, writes);
            }
        }
    }
}

/// Conservative side-effect analysis: true when re-evaluating the expression
/// could observably differ from evaluating it once.
pub(crate) fn has_side_effects(node: &Node, ctx: &crate::context::Context) -> bool {
    match &node.kind {
        NodeKind::Symbol(_) | NodeKind::Constant(_) => false,
        NodeKind::Unary { op, operand } => op.requires_lvalue() || has_side_effects(operand, ctx),
        NodeKind::Binary { op, left, right } => {
            op.is_assignment() || has_side_effects(left, ctx) || has_side_effects(right, ctx)
        }
        NodeKind::Swizzle { operand, .. } => has_side_effects(operand, ctx),
        NodeKind::Ternary {
            condition,
            true_expr,
            false_expr,
        } => {
            has_side_effects(condition, ctx)
                || has_side_effects(true_expr, ctx)
                || has_side_effects(false_expr, ctx)
        }
        NodeKind::Call { target, args } => {
            // User-defined functions are assumed side-effecting; builtins and
            // constructors are pure.
            matches!(target, crate::ast::CallTarget::Function(_))
                || args.iter().any(|a| has_side_effects(a, ctx))
        }
        // Statements are not expressions; treat them as effectful.
        _ => true,
    }
}

/// Copy an l-value access chain so a pass can evaluate it more than once
/// without repeating side effects.
///
/// Side-effecting index expressions are evaluated into fresh temporaries
/// whose declarations are pushed onto `hoisted`; the returned chain indexes
/// through those temporaries and is safe to deep-copy further. The caller
/// inserts `hoisted` before the first use of the chain.
pub(crate) fn snapshot_access_chain(
    t: &mut Traverser,
    node: &Node,
    hoisted: &mut Vec<Node>,
) -> Node {
    match &node.kind {
        NodeKind::Binary {
            op: BinaryOp::Index,
            left,
            right,
        } => {
            let base = snapshot_access_chain(t, left, hoisted);
            let index = if has_side_effects(right, t.ctx) {
                let value = right.deep_copy(t.ctx);
                let temp = t.temp_variable(right.ty.clone());
                t.next_temporary();
                hoisted.push(build::declare_init(t.ctx, temp, value));
                build::symbol(t.ctx, temp)
            } else {
                right.deep_copy(t.ctx)
            };
            build::binary(t.ctx, BinaryOp::Index, base, index, node.ty.clone())
        }
        NodeKind::Binary {
            op: BinaryOp::IndexStruct,
            left,
            right,
        } => {
            let base = snapshot_access_chain(t, left, hoisted);
            let field = right.deep_copy(t.ctx);
            build::binary(t.ctx, BinaryOp::IndexStruct, base, field, node.ty.clone())
        }
        NodeKind::Swizzle {
            operand,
            components,
        } => {
            let base = snapshot_access_chain(t, operand, hoisted);
            build::swizzle(t.ctx, base, components.clone())
        }
        _ => node.deep_copy(t.ctx),
    }
}
