//! Route complex out/inout arguments through temporaries.
//!
//! Targets that pass output parameters by address cannot take the address of
//! a swizzle or of an arbitrary access chain. Every such argument is replaced
//! by a fresh temporary: inout arguments copy the original value in before
//! the call, and both kinds copy the temporary back into the original
//! l-value right after the enclosing statement.
//!
//! Plain symbol arguments already have an address and pass through untouched.
//! Two output arguments rooted in the same variable would make the copy-back
//! order observable, so aliased output arguments are rejected. Swizzles of
//! the same vector with pairwise-disjoint components write distinct scalars
//! and pass the check.

use std::collections::BTreeMap;

use log::debug;

use crate::ast::{build, CallTarget, Node, NodeKind, VariableId};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::traverse::{
    run_to_fixed_point, traverse, Traverse, Traverser, ValidateOptions, VisitPhase, Visitor,
};

use super::{has_side_effects, snapshot_access_chain};

/// Variable at the root of an l-value access chain
fn base_variable(node: &Node) -> Option<VariableId> {
    match &node.kind {
        NodeKind::Symbol(var) => Some(*var),
        NodeKind::Binary { left, .. } => base_variable(left),
        NodeKind::Swizzle { operand, .. } => base_variable(operand),
        _ => None,
    }
}

/// True when every argument in the group is a swizzle directly over a symbol
/// and no component appears twice
fn disjoint_swizzles(group: &[&Node]) -> bool {
    let mut seen = [false; 4];
    for arg in group {
        let components = match &arg.kind {
            NodeKind::Swizzle {
                operand,
                components,
            } if matches!(operand.kind, NodeKind::Symbol(_)) => components,
            _ => return false,
        };
        for component in components {
            match seen.get_mut(*component as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
    }
    true
}

struct RewriteOutParameters;

impl Visitor for RewriteOutParameters {
    fn visit_call(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        // Children first, so calls nested inside value arguments are already
        // queued by the time their parent call is handled.
        if phase != VisitPhase::Post {
            return Traverse::Children;
        }

        let (function, args) = match &node.kind {
            NodeKind::Call {
                target: CallTarget::Function(function),
                args,
            } => (*function, args),
            _ => return Traverse::Children,
        };

        let directions: Vec<_> = t
            .ctx
            .functions
            .get(function)
            .parameters
            .iter()
            .map(|p| p.direction)
            .collect();

        let outputs: Vec<(usize, bool)> = args
            .iter()
            .enumerate()
            .filter_map(|(i, _)| {
                directions
                    .get(i)
                    .filter(|d| d.is_output())
                    .map(|d| (i, d.is_input()))
            })
            .collect();

        if outputs.is_empty() {
            return Traverse::Children;
        }

        // Output arguments rooted in the same variable alias each other,
        // except disjoint component swizzles of the same vector.
        let mut roots: BTreeMap<VariableId, Vec<&Node>> = BTreeMap::new();
        for (i, _) in &outputs {
            if let Some(var) = base_variable(&args[*i]) {
                roots.entry(var).or_default().push(&args[*i]);
            }
        }
        for (var, group) in &roots {
            if group.len() > 1 && !disjoint_swizzles(group) {
                t.set_error(Error::AliasedOutParameters {
                    name: t.ctx.variables.get(*var).name.clone(),
                });
                return Traverse::Skip;
            }
        }

        if t.current_statement().is_none() {
            // Calls outside statement context (global initializers) cannot
            // host the copy-in/copy-out statements.
            return Traverse::Children;
        }

        for (i, copies_in) in outputs {
            let arg = &args[i];
            if matches!(arg.kind, NodeKind::Symbol(_)) {
                continue;
            }

            // The argument's access chain is evaluated again for the
            // copy-in and the copy-back; indices with side effects are
            // hoisted so they run exactly once, before the call.
            let mut before = Vec::new();
            let stable = if has_side_effects(arg, t.ctx) {
                snapshot_access_chain(t, arg, &mut before)
            } else {
                arg.deep_copy(t.ctx)
            };

            let value_type = arg.ty.clone();
            let temp = t.temp_variable(value_type);
            t.next_temporary();
            debug!(
                "routing output argument {} through {}",
                i,
                t.ctx.variables.get(temp).name
            );

            let declaration = if copies_in {
                let initial = stable.deep_copy(t.ctx);
                build::declare_init(t.ctx, temp, initial)
            } else {
                build::declare(t.ctx, temp)
            };
            before.push(declaration);

            let temp_value = build::symbol(t.ctx, temp);
            let copy_back = build::assign(t.ctx, stable, temp_value);

            let temp_arg = build::symbol(t.ctx, temp);
            t.queue_replacement(node.id, arg.id, temp_arg);
            t.insert_in_parent_block(before, vec![copy_back]);
        }

        Traverse::Children
    }
}

/// Replace non-symbol out/inout arguments with temporaries copied around the
/// enclosing statement
pub fn rewrite_out_parameters(root: &mut Node, ctx: &mut Context) -> Result<()> {
    // Copy-in/copy-back expressions are snapshots taken while queueing, so a
    // call nested inside a rewritten argument reappears in the copies and is
    // picked up on the next iteration.
    run_to_fixed_point(root, ctx, "rewrite_out_parameters", |root, ctx| {
        let mut t = Traverser::new(ctx);
        traverse(root, &mut RewriteOutParameters, &mut t);
        t.finish()
    })?;

    crate::traverse::validate(root, ctx, &ValidateOptions::default())
}
