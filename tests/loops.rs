mod common;

use pretty_assertions::assert_eq;

use glslx::ast::{build, BinaryOp, ConstantValue, Node, NodeKind, Scalar, UnaryOp};
use glslx::passes::chunk_loops;
use glslx::Context;

/// (start, comparison, bound) of a chunked loop
fn loop_range(node: &Node) -> (i32, BinaryOp, i32) {
    let (init, condition) = match &node.kind {
        NodeKind::Loop {
            init: Some(init),
            condition: Some(condition),
            ..
        } => (init, condition),
        other => panic!("expected a counted loop, found {:?}", other),
    };

    let start = match &init.kind {
        NodeKind::Declaration { declarators } => match &declarators[0].kind {
            NodeKind::Binary { right, .. } => match &right.kind {
                NodeKind::Constant(ConstantValue(values)) => match values.as_slice() {
                    [Scalar::Int(v)] => *v,
                    other => panic!("expected an int start, found {:?}", other),
                },
                other => panic!("expected a constant start, found {:?}", other),
            },
            other => panic!("expected an initialized index, found {:?}", other),
        },
        other => panic!("expected an index declaration, found {:?}", other),
    };

    match &condition.kind {
        NodeKind::Binary { op, right, .. } => match &right.kind {
            NodeKind::Constant(ConstantValue(values)) => match values.as_slice() {
                [Scalar::Int(v)] => (start, *op, *v),
                other => panic!("expected an int bound, found {:?}", other),
            },
            other => panic!("expected a constant bound, found {:?}", other),
        },
        other => panic!("expected a comparison, found {:?}", other),
    }
}

/// for (int i = 0; i < bound; ++i) { s += 1.0; }
fn counted_loop(ctx: &mut Context, bound: i32) -> (Vec<Node>, Node) {
    let s = common::local(ctx, "s", common::float_ty());
    let decl_s = build::declare(ctx, s);

    let i = common::local(ctx, "i", common::int_ty());
    let zero = build::int(ctx, 0);
    let init = build::declare_init(ctx, i, zero);

    let cond_index = build::symbol(ctx, i);
    let cond_bound = build::int(ctx, bound);
    let condition = build::compare(ctx, BinaryOp::LessThan, cond_index, cond_bound);

    let inc_index = build::symbol(ctx, i);
    let increment = build::unary(ctx, UnaryOp::PreIncrement, inc_index);

    let target = build::symbol(ctx, s);
    let one = build::float(ctx, 1.0);
    let ty = target.ty.clone();
    let add = build::binary(ctx, BinaryOp::AddAssign, target, one, ty);
    let body = build::block(ctx, vec![add]);

    let lp = build::for_loop(ctx, Some(init), Some(condition), Some(increment), body);
    (vec![decl_s], lp)
}

#[test]
fn oversized_loop_is_split_into_consecutive_ranges() {
    common::init_logger();
    let mut ctx = Context::new();

    let (mut statements, lp) = counted_loop(&mut ctx, 1000);
    statements.push(lp);
    let main = common::main_definition(&mut ctx, statements);
    let mut root = common::shader(&mut ctx, vec![main]);

    chunk_loops(&mut root, &mut ctx, 255).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 5);

    assert_eq!(loop_range(&body[1]), (0, BinaryOp::LessThan, 255));
    assert_eq!(loop_range(&body[2]), (255, BinaryOp::LessThan, 510));
    assert_eq!(loop_range(&body[3]), (510, BinaryOp::LessThan, 765));
    // The last chunk keeps the original bound.
    assert_eq!(loop_range(&body[4]), (765, BinaryOp::LessThan, 1000));
}

#[test]
fn loops_under_the_cap_are_untouched() {
    common::init_logger();
    let mut ctx = Context::new();

    let (mut statements, lp) = counted_loop(&mut ctx, 100);
    statements.push(lp);
    let main = common::main_definition(&mut ctx, statements);
    let mut root = common::shader(&mut ctx, vec![main]);
    let before = root.count();

    chunk_loops(&mut root, &mut ctx, 255).unwrap();

    assert_eq!(root.count(), before);
}

#[test]
fn loops_writing_their_index_are_untouched() {
    common::init_logger();
    let mut ctx = Context::new();

    let i = common::local(&mut ctx, "i", common::int_ty());
    let zero = build::int(&mut ctx, 0);
    let init = build::declare_init(&mut ctx, i, zero);

    let cond_index = build::symbol(&mut ctx, i);
    let cond_bound = build::int(&mut ctx, 1000);
    let condition = build::compare(&mut ctx, BinaryOp::LessThan, cond_index, cond_bound);

    let inc_index = build::symbol(&mut ctx, i);
    let increment = build::unary(&mut ctx, UnaryOp::PreIncrement, inc_index);

    // The body writes the index, so the folded ranges would be wrong.
    let target = build::symbol(&mut ctx, i);
    let one = build::int(&mut ctx, 1);
    let ty = target.ty.clone();
    let write = build::binary(&mut ctx, BinaryOp::AddAssign, target, one, ty);
    let body = build::block(&mut ctx, vec![write]);

    let lp = build::for_loop(&mut ctx, Some(init), Some(condition), Some(increment), body);
    let main = common::main_definition(&mut ctx, vec![lp]);
    let mut root = common::shader(&mut ctx, vec![main]);
    let before = root.count();

    chunk_loops(&mut root, &mut ctx, 255).unwrap();

    assert_eq!(root.count(), before);
}
