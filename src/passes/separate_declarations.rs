//! Split multi-declarator declarations into one declaration per variable.
//!
//! Runs first in every pipeline: several later passes consume declarations
//! under the single-declarator guarantee and assert it.

use log::debug;

use crate::ast::{build, Node, NodeKind};
use crate::context::Context;
use crate::error::Result;
use crate::traverse::{apply, traverse, Traverse, Traverser, VisitPhase, Visitor};

struct SeparateDeclarations;

impl Visitor for SeparateDeclarations {
    fn visit_block(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase != VisitPhase::Pre {
            return Traverse::Children;
        }

        if let NodeKind::Block { statements } = &node.kind {
            for stmt in statements {
                if let NodeKind::Declaration { declarators } = &stmt.kind {
                    if declarators.len() > 1 {
                        debug!("separating {} declarators", declarators.len());

                        let singles: Vec<Node> = declarators
                            .iter()
                            .map(|d| {
                                let copy = d.deep_copy(t.ctx);
                                build::declare_many(t.ctx, vec![copy])
                            })
                            .collect();

                        t.queue_multi_replacement(node.id, stmt.id, singles);
                    }
                }
            }
        }

        Traverse::Children
    }
}

/// Rewrite `float a = 1.0, b = 2.0;` into two consecutive declarations
pub fn separate_declarations(root: &mut Node, ctx: &mut Context) -> Result<()> {
    let mut t = Traverser::new(ctx);
    traverse(root, &mut SeparateDeclarations, &mut t);
    let edits = t.finish()?;
    apply(root, edits, ctx)
}
