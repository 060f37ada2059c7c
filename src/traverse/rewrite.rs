//! Deferred mutation queue.
//!
//! Edits are recorded during a read-only traversal and replayed in queued
//! order once it finishes. A record whose parent or child is no longer in the
//! tree at apply time is a pass-author bug and aborts the translation.

use log::trace;

use crate::ast::{Node, NodeId, NodeKind, ReplaceOutcome};
use crate::context::Context;
use crate::error::{Error, Result};

/// Builds the replacement from the old node at apply time; the old node is
/// moved into the result and must not be re-inserted elsewhere
pub type WrapFn = Box<dyn FnOnce(Node, &mut Context) -> Node>;

/// What takes the place of a replaced child
pub enum Replacement {
    /// A single node
    With(Node),
    /// Zero or more siblings; zero deletes the child
    Multi(Vec<Node>),
    /// A wrapper built around the old node
    Wrap(WrapFn),
}

enum Edit {
    Replace {
        parent: NodeId,
        old: NodeId,
        with: Replacement,
    },
    Insert {
        block: NodeId,
        anchor: NodeId,
        before: Vec<Node>,
        after: Vec<Node>,
    },
}

/// Ordered log of queued edits for one traversal
#[derive(Default)]
pub struct EditList {
    edits: Vec<Edit>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub(crate) fn push_replace(&mut self, parent: NodeId, old: NodeId, with: Replacement) {
        self.edits.push(Edit::Replace { parent, old, with });
    }

    pub(crate) fn push_insert(
        &mut self,
        block: NodeId,
        anchor: NodeId,
        before: Vec<Node>,
        after: Vec<Node>,
    ) {
        self.edits.push(Edit::Insert {
            block,
            anchor,
            before,
            after,
        });
    }
}

/// Replay the queued edits against the tree, in queued order.
///
/// Each record's parent is located by id; a parent removed by an earlier
/// record in the same batch surfaces as [Error::StaleMutation].
pub fn apply(root: &mut Node, edits: EditList, ctx: &mut Context) -> Result<()> {
    trace!("applying {} queued edits", edits.len());

    for edit in edits.edits {
        match edit {
            Edit::Replace { parent, old, with } => {
                let parent_node = root
                    .find_mut(parent)
                    .ok_or(Error::StaleMutation { parent, child: old })?;

                match with {
                    Replacement::With(node) => {
                        match parent_node.replace_child(old, vec![node]) {
                            ReplaceOutcome::Done => {}
                            ReplaceOutcome::NotFound => {
                                return Err(Error::StaleMutation { parent, child: old })
                            }
                            ReplaceOutcome::SingleSlot => unreachable!(),
                        }
                    }
                    Replacement::Multi(nodes) => {
                        let count = nodes.len();
                        match parent_node.replace_child(old, nodes) {
                            ReplaceOutcome::Done => {}
                            ReplaceOutcome::NotFound => {
                                return Err(Error::StaleMutation { parent, child: old })
                            }
                            ReplaceOutcome::SingleSlot => {
                                return Err(Error::InvalidMultiReplacement { parent, count })
                            }
                        }
                    }
                    Replacement::Wrap(wrap) => {
                        let old_node = parent_node
                            .take_child(old)
                            .ok_or(Error::StaleMutation { parent, child: old })?;
                        let new_node = wrap(old_node, ctx);

                        // take_child left a placeholder in the vacated slot
                        let parent_node = root
                            .find_mut(parent)
                            .ok_or(Error::StaleMutation { parent, child: old })?;
                        match parent_node.replace_child(NodeId::PLACEHOLDER, vec![new_node]) {
                            ReplaceOutcome::Done => {}
                            _ => return Err(Error::StaleMutation { parent, child: old }),
                        }
                    }
                }
            }

            Edit::Insert {
                block,
                anchor,
                before,
                after,
            } => {
                let block_node = root.find_mut(block).ok_or(Error::StaleMutation {
                    parent: block,
                    child: anchor,
                })?;

                let statements = match &mut block_node.kind {
                    NodeKind::Block { statements } => statements,
                    _ => {
                        return Err(Error::Internal(format!(
                            "statement insertion into non-block node {:?}",
                            block
                        )))
                    }
                };

                let pos = statements
                    .iter()
                    .position(|s| s.id == anchor)
                    .ok_or(Error::StaleMutation {
                        parent: block,
                        child: anchor,
                    })?;

                let after_pos = pos + before.len() + 1;
                statements.splice(pos..pos, before.into_iter());
                statements.splice(after_pos..after_pos, after.into_iter());
            }
        }
    }

    Ok(())
}

/// Re-run a queueing step until one full traversal queues nothing.
///
/// The step receives the tree and the context and returns the edits it
/// queued. The iteration count is capped by the tree's node count; overrunning
/// the cap means a pass keeps finding new matches forever and is reported as
/// an internal error instead of hanging.
pub fn run_to_fixed_point(
    root: &mut Node,
    ctx: &mut Context,
    pass: &'static str,
    mut step: impl FnMut(&Node, &mut Context) -> Result<EditList>,
) -> Result<()> {
    let cap = root.count().max(1);

    for _ in 0..cap {
        let edits = step(root, ctx)?;
        if edits.is_empty() {
            return Ok(());
        }
        apply(root, edits, ctx)?;
    }

    Err(Error::FixedPointDivergence {
        pass,
        iterations: cap,
    })
}
