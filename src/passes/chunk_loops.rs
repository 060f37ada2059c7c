//! Split counted loops that exceed the target's iteration cap.
//!
//! Some targets bound the trip count a single loop may have. A canonical
//! counted loop whose constant trip count exceeds the cap is replaced by a
//! run of consecutive loops covering the same index range in order:
//!
//! ```text
//! for (int i = 0; i < 1000; ++i) { .. }
//! ```
//!
//! with a cap of 255 becomes four loops over `[0,255)`, `[255,510)`,
//! `[510,765)` and `[765,1000)`. The rewrite only fires on the canonical
//! shape: integer index declared in the init clause, constant bound, constant
//! positive step, index unwritten by the body. Anything else stays as is and
//! is the target's problem to reject.

use std::collections::BTreeMap;

use log::debug;

use crate::ast::{
    build, BasicType, BinaryOp, ConstantValue, Node, NodeKind, Scalar, UnaryOp, VariableId,
};
use crate::context::Context;
use crate::error::Result;
use crate::traverse::{apply, traverse, Traverse, Traverser, ValidateOptions, VisitPhase, Visitor};

use super::{collect_references, expect_single_declarator};

/// Canonical counted loop, with the index range folded to integers
struct Counted {
    index: VariableId,
    basic: BasicType,
    start: i64,
    bound: i64,
    inclusive: bool,
    step: i64,
}

impl Counted {
    fn trips(&self) -> i64 {
        let span = self.bound - self.start + if self.inclusive { 1 } else { 0 };
        if span <= 0 {
            0
        } else {
            (span + self.step - 1) / self.step
        }
    }
}

fn constant_int(node: &Node) -> Option<(i64, BasicType)> {
    match &node.kind {
        NodeKind::Constant(ConstantValue(values)) => match values.as_slice() {
            [Scalar::Int(v)] => Some((i64::from(*v), BasicType::Int)),
            [Scalar::UInt(v)] => Some((i64::from(*v), BasicType::UInt)),
            _ => None,
        },
        _ => None,
    }
}

fn index_symbol(node: &Node) -> Option<VariableId> {
    match &node.kind {
        NodeKind::Symbol(var) => Some(*var),
        _ => None,
    }
}

/// Match `for (T i = c0; i < c1; ++i)` and close variants
fn match_counted(node: &Node, ctx: &Context) -> Option<Counted> {
    let (init, condition, increment, body) = match &node.kind {
        NodeKind::Loop {
            init: Some(init),
            condition: Some(condition),
            increment: Some(increment),
            body,
            ..
        } => (init, condition, increment, body),
        _ => return None,
    };

    // Init: single-declarator declaration of the index with a constant
    // integer initializer.
    let declarator = expect_single_declarator(init).ok()?;
    let (index, start, basic) = match &declarator.kind {
        NodeKind::Binary {
            op: BinaryOp::Initialize,
            left,
            right,
        } => {
            let index = index_symbol(left)?;
            let (start, basic) = constant_int(right)?;
            (index, start, basic)
        }
        _ => return None,
    };

    // Condition: index compared upward against a constant.
    let (bound, inclusive) = match &condition.kind {
        NodeKind::Binary { op, left, right } if index_symbol(left) == Some(index) => {
            let (bound, _) = constant_int(right)?;
            match op {
                BinaryOp::LessThan => (bound, false),
                BinaryOp::LessThanEqual => (bound, true),
                _ => return None,
            }
        }
        _ => return None,
    };

    // Increment: ++i, i += c or i = i + c with a constant positive step.
    let step = match &increment.kind {
        NodeKind::Unary { op, operand } if index_symbol(operand) == Some(index) => match op {
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => 1,
            _ => return None,
        },
        NodeKind::Binary {
            op: BinaryOp::AddAssign,
            left,
            right,
        } if index_symbol(left) == Some(index) => constant_int(right)?.0,
        NodeKind::Binary {
            op: BinaryOp::Assign,
            left,
            right,
        } if index_symbol(left) == Some(index) => match &right.kind {
            NodeKind::Binary {
                op: BinaryOp::Add,
                left: add_left,
                right: add_right,
            } if index_symbol(add_left) == Some(index) => constant_int(add_right)?.0,
            _ => return None,
        },
        _ => return None,
    };
    if step <= 0 {
        return None;
    }

    // The body must not touch the index, or the folded range is wrong.
    let mut reads = BTreeMap::new();
    let mut writes = BTreeMap::new();
    collect_references(body, ctx, false, &mut reads, &mut writes);
    if writes.contains_key(&index) {
        return None;
    }

    Some(Counted {
        index,
        basic,
        start,
        bound,
        inclusive,
        step,
    })
}

fn int_constant(ctx: &mut Context, basic: BasicType, value: i64) -> Node {
    match basic {
        BasicType::UInt => build::uint(ctx, value as u32),
        _ => build::int(ctx, value as i32),
    }
}

struct ChunkLoops {
    max_iterations: i64,
}

impl Visitor for ChunkLoops {
    fn visit_loop(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase != VisitPhase::Pre {
            return Traverse::Children;
        }

        // The rewrite replaces a whole statement with several loops.
        if t.current_statement() != Some(node.id) {
            return Traverse::Children;
        }
        let block = match t.parent_block() {
            Some(b) => b,
            None => return Traverse::Children,
        };

        let counted = match match_counted(node, t.ctx) {
            Some(c) => c,
            None => return Traverse::Children,
        };

        let trips = counted.trips();
        if trips <= self.max_iterations {
            return Traverse::Children;
        }

        let (body, increment) = match &node.kind {
            NodeKind::Loop {
                body,
                increment: Some(increment),
                ..
            } => (body, increment),
            _ => return Traverse::Children,
        };

        debug!(
            "chunking {}-iteration loop into runs of {}",
            trips, self.max_iterations
        );

        let mut chunks = Vec::new();
        let mut done = 0i64;
        while done < trips {
            let chunk_trips = (trips - done).min(self.max_iterations);
            let chunk_start = counted.start + done * counted.step;
            let last = done + chunk_trips == trips;

            let index_init = int_constant(t.ctx, counted.basic, chunk_start);
            let init = build::declare_init(t.ctx, counted.index, index_init);

            // Intermediate chunks get an exclusive bound at their own end;
            // the last one keeps the original comparison.
            let (op, bound) = if last {
                let op = if counted.inclusive {
                    BinaryOp::LessThanEqual
                } else {
                    BinaryOp::LessThan
                };
                (op, counted.bound)
            } else {
                (BinaryOp::LessThan, chunk_start + chunk_trips * counted.step)
            };
            let cond_index = build::symbol(t.ctx, counted.index);
            let cond_bound = int_constant(t.ctx, counted.basic, bound);
            let condition = build::compare(t.ctx, op, cond_index, cond_bound);

            let chunk_increment = increment.deep_copy(t.ctx);
            let chunk_body = body.deep_copy(t.ctx);
            chunks.push(build::for_loop(
                t.ctx,
                Some(init),
                Some(condition),
                Some(chunk_increment),
                chunk_body,
            ));

            done += chunk_trips;
        }

        t.queue_multi_replacement(block, node.id, chunks);
        Traverse::Skip
    }
}

/// Split canonical counted loops whose trip count exceeds `max_iterations`
pub fn chunk_loops(root: &mut Node, ctx: &mut Context, max_iterations: u32) -> Result<()> {
    if max_iterations == 0 {
        return Ok(());
    }

    let mut visitor = ChunkLoops {
        max_iterations: i64::from(max_iterations),
    };
    let mut t = Traverser::new(ctx);
    traverse(root, &mut visitor, &mut t);
    let edits = t.finish()?;
    apply(root, edits, ctx)?;

    crate::traverse::validate(root, ctx, &ValidateOptions::default())
}
