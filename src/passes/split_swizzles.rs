//! Split multi-component swizzle assignments into scalar assignments.
//!
//! Targets without swizzled stores accept `v.x = e` but not `v.yx = e`. A
//! multi-component swizzle store is rewritten to evaluate its right-hand side
//! once into a temporary, then assign one component at a time:
//!
//! ```text
//! v.yx = e;   ->   vec2 sx0 = e;
//!                  v.y = sx0.x;
//!                  v.x = sx0.y;
//! ```
//!
//! Compound stores are first lowered to the plain form (`v.xy += e` becomes
//! `v.xy = v.xy + e`) and split on the next iteration. The split consumes a
//! whole statement, so a swizzle store buried inside a larger expression is
//! reported rather than rewritten.
//!
//! Both rewrites re-evaluate the stored base; side-effecting index
//! expressions in it are hoisted into temporaries so they run exactly once.

use log::debug;

use crate::ast::{build, BinaryOp, Node, NodeKind};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::traverse::{
    run_to_fixed_point, traverse, Traverse, Traverser, ValidateOptions, VisitPhase, Visitor,
};

use super::{has_side_effects, snapshot_access_chain};

struct SplitSwizzles;

impl Visitor for SplitSwizzles {
    fn visit_binary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase != VisitPhase::Pre {
            return Traverse::Children;
        }

        let (op, left, right) = match &node.kind {
            NodeKind::Binary { op, left, right } if op.is_assignment() => (*op, left, right),
            _ => return Traverse::Children,
        };

        let components = match &left.kind {
            NodeKind::Swizzle { components, .. } if components.len() > 1 => components.clone(),
            _ => return Traverse::Children,
        };

        if let Some(base) = op.compound_base() {
            // v.xy += e  ->  v.xy = v.xy + e
            let parent = match t.parent() {
                Some(p) => p,
                None => return Traverse::Children,
            };

            // The lowered form reads the target a second time.
            let mut hoisted = Vec::new();
            let store = if has_side_effects(left, t.ctx) {
                if t.current_statement() != Some(node.id) {
                    t.set_error(Error::NestedSwizzleAssignment);
                    return Traverse::Skip;
                }
                snapshot_access_chain(t, left, &mut hoisted)
            } else {
                left.deep_copy(t.ctx)
            };

            let read = store.deep_copy(t.ctx);
            let value = right.deep_copy(t.ctx);
            let combined = build::binary(t.ctx, base, read, value, left.ty.clone());
            let plain = build::assign(t.ctx, store, combined);
            // Hoisted declarations anchor on this statement, so they are
            // queued before the replacement that swaps it out.
            if !hoisted.is_empty() {
                t.insert_in_parent_block(hoisted, Vec::new());
            }
            t.queue_replacement(parent, node.id, plain);

            return Traverse::Skip;
        }

        if op != BinaryOp::Assign {
            return Traverse::Children;
        }

        // The split replaces a whole statement. A swizzle store used as a
        // value inside a larger expression has no statement to expand into.
        if t.current_statement() != Some(node.id) {
            t.set_error(Error::NestedSwizzleAssignment);
            return Traverse::Skip;
        }

        let block = match t.parent_block() {
            Some(b) => b,
            None => return Traverse::Children,
        };

        debug!("splitting {}-component swizzle store", components.len());

        let value = right.deep_copy(t.ctx);
        let temp = t.temp_variable(right.ty.clone());
        t.next_temporary();
        let declaration = build::declare_init(t.ctx, temp, value);

        let operand = match &left.kind {
            NodeKind::Swizzle { operand, .. } => operand,
            _ => return Traverse::Children,
        };

        let mut statements = vec![declaration];

        // One store per component re-reads the base.
        let stable = if has_side_effects(operand, t.ctx) {
            snapshot_access_chain(t, operand, &mut statements)
        } else {
            operand.deep_copy(t.ctx)
        };

        for (position, component) in components.iter().enumerate() {
            let target_base = stable.deep_copy(t.ctx);
            let target = build::swizzle(t.ctx, target_base, vec![*component]);

            let source_base = build::symbol(t.ctx, temp);
            let source = build::swizzle(t.ctx, source_base, vec![position as u8]);

            statements.push(build::assign(t.ctx, target, source));
        }

        t.queue_multi_replacement(block, node.id, statements);

        Traverse::Skip
    }
}

/// Rewrite multi-component swizzle stores into single-component assignments
pub fn split_swizzles(root: &mut Node, ctx: &mut Context) -> Result<()> {
    run_to_fixed_point(root, ctx, "split_swizzles", |root, ctx| {
        let mut t = Traverser::new(ctx);
        traverse(root, &mut SplitSwizzles, &mut t);
        t.finish()
    })?;

    crate::traverse::validate(root, ctx, &ValidateOptions::default())
}
