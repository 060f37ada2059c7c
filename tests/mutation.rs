mod common;

use pretty_assertions::assert_eq;

use glslx::ast::{build, Node, NodeKind, Scalar, UnaryOp};
use glslx::error::Error;
use glslx::traverse::{apply, traverse, Traverse, Traverser, VisitPhase, Visitor};
use glslx::Context;

fn float_value(node: &Node) -> f32 {
    match &node.kind {
        NodeKind::Constant(value) => match value.0.as_slice() {
            [Scalar::Float(v)] => *v,
            other => panic!("expected a float constant, found {:?}", other),
        },
        other => panic!("expected a constant, found {:?}", other),
    }
}

struct ReplaceConstant;

impl Visitor for ReplaceConstant {
    fn visit_constant(&mut self, t: &mut Traverser, node: &Node) {
        if float_value(node) == 1.0 {
            let parent = t.parent().unwrap();
            let two = build::float(t.ctx, 2.0);
            t.queue_replacement(parent, node.id, two);
        }
    }
}

#[test]
fn single_replacement() {
    common::init_logger();
    let mut ctx = Context::new();

    let a = common::local(&mut ctx, "a", common::float_ty());
    let decl = build::declare(&mut ctx, a);
    let lhs = build::symbol(&mut ctx, a);
    let one = build::float(&mut ctx, 1.0);
    let assign = build::assign(&mut ctx, lhs, one);

    let main = common::main_definition(&mut ctx, vec![decl, assign]);
    let mut root = common::shader(&mut ctx, vec![main]);

    let mut t = Traverser::new(&mut ctx);
    traverse(&root, &mut ReplaceConstant, &mut t);
    let edits = t.finish().unwrap();
    apply(&mut root, edits, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    match &body[1].kind {
        NodeKind::Binary { right, .. } => assert_eq!(float_value(right), 2.0),
        other => panic!("expected an assignment, found {:?}", other),
    }
}

struct WrapInNegate;

impl Visitor for WrapInNegate {
    fn visit_constant(&mut self, t: &mut Traverser, node: &Node) {
        let parent = t.parent().unwrap();
        t.queue_wrap(
            parent,
            node.id,
            Box::new(|old, ctx| build::unary(ctx, UnaryOp::Negate, old)),
        );
    }
}

#[test]
fn wrapping_moves_the_old_node() {
    common::init_logger();
    let mut ctx = Context::new();

    let a = common::local(&mut ctx, "a", common::float_ty());
    let decl = build::declare(&mut ctx, a);
    let lhs = build::symbol(&mut ctx, a);
    let value = build::float(&mut ctx, 3.0);
    let value_id = value.id;
    let assign = build::assign(&mut ctx, lhs, value);

    let main = common::main_definition(&mut ctx, vec![decl, assign]);
    let mut root = common::shader(&mut ctx, vec![main]);

    let mut t = Traverser::new(&mut ctx);
    traverse(&root, &mut WrapInNegate, &mut t);
    let edits = t.finish().unwrap();
    apply(&mut root, edits, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    match &body[1].kind {
        NodeKind::Binary { right, .. } => match &right.kind {
            NodeKind::Unary {
                op: UnaryOp::Negate,
                operand,
            } => {
                // The wrapped node keeps its identity.
                assert_eq!(operand.id, value_id);
                assert_eq!(float_value(operand), 3.0);
            }
            other => panic!("expected a negation, found {:?}", other),
        },
        other => panic!("expected an assignment, found {:?}", other),
    }
}

struct SurroundAssignments;

impl Visitor for SurroundAssignments {
    fn visit_binary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase != VisitPhase::Pre {
            return Traverse::Children;
        }

        if let NodeKind::Binary { op, .. } = &node.kind {
            if op.is_assignment() && t.current_statement() == Some(node.id) {
                let before = build::float(t.ctx, 10.0);
                let after = build::float(t.ctx, 20.0);
                t.insert_in_parent_block(vec![before], vec![after]);
            }
        }
        Traverse::Children
    }
}

#[test]
fn insertion_keeps_statement_order() {
    common::init_logger();
    let mut ctx = Context::new();

    let a = common::local(&mut ctx, "a", common::float_ty());
    let decl = build::declare(&mut ctx, a);
    let lhs = build::symbol(&mut ctx, a);
    let value = build::float(&mut ctx, 5.0);
    let assign = build::assign(&mut ctx, lhs, value);
    let assign_id = assign.id;

    let main = common::main_definition(&mut ctx, vec![decl, assign]);
    let mut root = common::shader(&mut ctx, vec![main]);

    let mut t = Traverser::new(&mut ctx);
    traverse(&root, &mut SurroundAssignments, &mut t);
    let edits = t.finish().unwrap();
    apply(&mut root, edits, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 4);
    assert_eq!(float_value(&body[1]), 10.0);
    assert_eq!(body[2].id, assign_id);
    assert_eq!(float_value(&body[3]), 20.0);
}

struct DeleteThenReplace;

impl Visitor for DeleteThenReplace {
    fn visit_binary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase != VisitPhase::Pre {
            return Traverse::Children;
        }

        if let NodeKind::Binary { op, .. } = &node.kind {
            if op.is_assignment() {
                let block = t.parent_block().unwrap();
                t.queue_multi_replacement(block, node.id, Vec::new());
                let replacement = build::float(t.ctx, 0.0);
                t.queue_replacement(block, node.id, replacement);
            }
        }
        Traverse::Children
    }
}

#[test]
fn stale_edits_are_detected() {
    common::init_logger();
    let mut ctx = Context::new();

    let a = common::local(&mut ctx, "a", common::float_ty());
    let decl = build::declare(&mut ctx, a);
    let lhs = build::symbol(&mut ctx, a);
    let value = build::float(&mut ctx, 1.0);
    let assign = build::assign(&mut ctx, lhs, value);

    let main = common::main_definition(&mut ctx, vec![decl, assign]);
    let mut root = common::shader(&mut ctx, vec![main]);

    let mut t = Traverser::new(&mut ctx);
    traverse(&root, &mut DeleteThenReplace, &mut t);
    let edits = t.finish().unwrap();

    match apply(&mut root, edits, &mut ctx) {
        Err(Error::StaleMutation { .. }) => {}
        other => panic!("expected StaleMutation, got {:?}", other),
    }
}
