//! Remove statements with no effect.
//!
//! Earlier passes delete declarations by multi-replacing them with nothing,
//! which can leave empty declarations, empty nested blocks and bare constant
//! statements behind. This pass sweeps them out before emission.

use crate::ast::{Node, NodeKind};
use crate::context::Context;
use crate::error::Result;
use crate::traverse::{traverse, Traverse, Traverser, VisitPhase, Visitor};

struct PruneNoOps;

fn is_no_op(stmt: &Node) -> bool {
    match &stmt.kind {
        NodeKind::Declaration { declarators } => declarators.is_empty(),
        NodeKind::Block { statements } => statements.is_empty(),
        NodeKind::Constant(_) => true,
        _ => false,
    }
}

impl Visitor for PruneNoOps {
    fn visit_block(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase != VisitPhase::Pre {
            return Traverse::Children;
        }

        if let NodeKind::Block { statements } = &node.kind {
            for stmt in statements {
                if is_no_op(stmt) {
                    t.queue_multi_replacement(node.id, stmt.id, Vec::new());
                }
            }
        }

        Traverse::Children
    }
}

/// Drop empty declarations, empty nested blocks and constant statements
pub fn prune_no_ops(root: &mut Node, ctx: &mut Context) -> Result<()> {
    // Removing an inner empty block can empty its parent, so iterate.
    crate::traverse::run_to_fixed_point(root, ctx, "prune_no_ops", |root, ctx| {
        let mut t = Traverser::new(ctx);
        traverse(root, &mut PruneNoOps, &mut t);
        t.finish()
    })
}
