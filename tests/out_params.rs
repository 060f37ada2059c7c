mod common;

use pretty_assertions::assert_eq;

use glslx::ast::{build, ArraySize, BinaryOp, Node, NodeKind, ParamDirection, Type, UnaryOp};
use glslx::error::Error;
use glslx::passes::rewrite_out_parameters;
use glslx::Context;

fn count_increments(node: &Node) -> usize {
    let own = matches!(
        node.kind,
        NodeKind::Unary {
            op: UnaryOp::PostIncrement,
            ..
        }
    ) as usize;
    own + node
        .children()
        .into_iter()
        .map(count_increments)
        .sum::<usize>()
}

#[test]
fn swizzled_argument_goes_through_a_temporary() {
    common::init_logger();
    let mut ctx = Context::new();

    let x = ctx.internal_param("x", common::float_ty(), ParamDirection::Out);
    let f = common::function(&mut ctx, "f", Type::void(), vec![x]);

    let v = common::local(&mut ctx, "v", common::vec_ty(2));
    let decl = build::declare(&mut ctx, v);
    let operand = build::symbol(&mut ctx, v);
    let arg = build::swizzle(&mut ctx, operand, vec![0]);
    let call = build::call(&mut ctx, f, vec![arg]);

    let main = common::main_definition(&mut ctx, vec![decl, call]);
    let mut root = common::shader(&mut ctx, vec![main]);

    rewrite_out_parameters(&mut root, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 4);

    // Temporary declared before the call, without an initializer for a pure
    // out parameter.
    let temp = common::declared_var(&body[1]);
    assert!(ctx.variables.get(temp).name.starts_with("sx"));

    // The call argument is now the plain temporary.
    match &body[2].kind {
        NodeKind::Call { args, .. } => match &args[0].kind {
            NodeKind::Symbol(var) => assert_eq!(*var, temp),
            other => panic!("expected a symbol argument, found {:?}", other),
        },
        other => panic!("expected the call, found {:?}", other),
    }

    // Copy-back into the original swizzle after the call.
    match &body[3].kind {
        NodeKind::Binary {
            op: BinaryOp::Assign,
            left,
            right,
        } => {
            assert!(matches!(left.kind, NodeKind::Swizzle { .. }));
            match &right.kind {
                NodeKind::Symbol(var) => assert_eq!(*var, temp),
                other => panic!("expected the temporary, found {:?}", other),
            }
        }
        other => panic!("expected the copy-back, found {:?}", other),
    }
}

#[test]
fn inout_arguments_copy_in() {
    common::init_logger();
    let mut ctx = Context::new();

    let x = ctx.internal_param("x", common::float_ty(), ParamDirection::InOut);
    let f = common::function(&mut ctx, "f", Type::void(), vec![x]);

    let v = common::local(&mut ctx, "v", common::vec_ty(2));
    let decl = build::declare(&mut ctx, v);
    let operand = build::symbol(&mut ctx, v);
    let arg = build::swizzle(&mut ctx, operand, vec![1]);
    let call = build::call(&mut ctx, f, vec![arg]);

    let main = common::main_definition(&mut ctx, vec![decl, call]);
    let mut root = common::shader(&mut ctx, vec![main]);

    rewrite_out_parameters(&mut root, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 4);

    // inout: the temporary is initialized with the argument's value.
    match &body[1].kind {
        NodeKind::Declaration { declarators } => match &declarators[0].kind {
            NodeKind::Binary {
                op: BinaryOp::Initialize,
                right,
                ..
            } => assert!(matches!(right.kind, NodeKind::Swizzle { .. })),
            other => panic!("expected an initialized declarator, found {:?}", other),
        },
        other => panic!("expected a declaration, found {:?}", other),
    }
}

#[test]
fn plain_symbol_arguments_are_left_alone() {
    common::init_logger();
    let mut ctx = Context::new();

    let x = ctx.internal_param("x", common::float_ty(), ParamDirection::Out);
    let f = common::function(&mut ctx, "f", Type::void(), vec![x]);

    let v = common::local(&mut ctx, "v", common::float_ty());
    let decl = build::declare(&mut ctx, v);
    let arg = build::symbol(&mut ctx, v);
    let call = build::call(&mut ctx, f, vec![arg]);

    let main = common::main_definition(&mut ctx, vec![decl, call]);
    let mut root = common::shader(&mut ctx, vec![main]);

    rewrite_out_parameters(&mut root, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 2);
}

#[test]
fn aliased_outputs_are_rejected() {
    common::init_logger();
    let mut ctx = Context::new();

    let a = ctx.internal_param("a", common::vec_ty(2), ParamDirection::Out);
    let b = ctx.internal_param("b", common::float_ty(), ParamDirection::Out);
    let f = common::function(&mut ctx, "f", Type::void(), vec![a, b]);

    // f(v.xy, v.y); both arguments write component y.
    let v = common::local(&mut ctx, "v", common::vec_ty(2));
    let decl = build::declare(&mut ctx, v);
    let first_operand = build::symbol(&mut ctx, v);
    let first = build::swizzle(&mut ctx, first_operand, vec![0, 1]);
    let second_operand = build::symbol(&mut ctx, v);
    let second = build::swizzle(&mut ctx, second_operand, vec![1]);
    let call = build::call(&mut ctx, f, vec![first, second]);

    let main = common::main_definition(&mut ctx, vec![decl, call]);
    let mut root = common::shader(&mut ctx, vec![main]);

    match rewrite_out_parameters(&mut root, &mut ctx) {
        Err(Error::AliasedOutParameters { name }) => assert_eq!(name, "v"),
        other => panic!("expected AliasedOutParameters, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn disjoint_swizzle_outputs_are_accepted() {
    common::init_logger();
    let mut ctx = Context::new();

    let a = ctx.internal_param("a", common::float_ty(), ParamDirection::Out);
    let b = ctx.internal_param("b", common::float_ty(), ParamDirection::Out);
    let f = common::function(&mut ctx, "f", Type::void(), vec![a, b]);

    // f(v.x, v.y); distinct components of one vector do not alias.
    let v = common::local(&mut ctx, "v", common::vec_ty(2));
    let decl = build::declare(&mut ctx, v);
    let first_operand = build::symbol(&mut ctx, v);
    let first = build::swizzle(&mut ctx, first_operand, vec![0]);
    let second_operand = build::symbol(&mut ctx, v);
    let second = build::swizzle(&mut ctx, second_operand, vec![1]);
    let call = build::call(&mut ctx, f, vec![first, second]);

    let main = common::main_definition(&mut ctx, vec![decl, call]);
    let mut root = common::shader(&mut ctx, vec![main]);

    rewrite_out_parameters(&mut root, &mut ctx).unwrap();

    // Declaration, two temporaries, the call, two copy-backs.
    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 6);
    for copy_back in &body[4..] {
        match &copy_back.kind {
            NodeKind::Binary {
                op: BinaryOp::Assign,
                left,
                ..
            } => assert!(matches!(left.kind, NodeKind::Swizzle { .. })),
            other => panic!("expected a copy-back, found {:?}", other),
        }
    }
}

#[test]
fn indexed_arguments_evaluate_their_index_once() {
    common::init_logger();
    let mut ctx = Context::new();

    let x = ctx.internal_param("x", common::float_ty(), ParamDirection::InOut);
    let f = common::function(&mut ctx, "f", Type::void(), vec![x]);

    // f(a[i++]); the increment must run exactly once.
    let element = common::float_ty();
    let a = common::local(&mut ctx, "a", element.with_array(ArraySize::Fixed(4)));
    let i = common::local(&mut ctx, "i", common::int_ty());
    let decl_a = build::declare(&mut ctx, a);
    let decl_i = build::declare(&mut ctx, i);

    let operand = build::symbol(&mut ctx, a);
    let counter = build::symbol(&mut ctx, i);
    let bump = build::unary(&mut ctx, UnaryOp::PostIncrement, counter);
    let arg = build::index(&mut ctx, operand, bump);
    let call = build::call(&mut ctx, f, vec![arg]);

    let main = common::main_definition(&mut ctx, vec![decl_a, decl_i, call]);
    let mut root = common::shader(&mut ctx, vec![main]);

    rewrite_out_parameters(&mut root, &mut ctx).unwrap();

    assert_eq!(count_increments(&root), 1);

    // Two declarations, hoisted index, copy-in temporary, call, copy-back.
    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 6);

    // The copy-back indexes through the hoisted temporary, not `i++`.
    match &body[5].kind {
        NodeKind::Binary {
            op: BinaryOp::Assign,
            left,
            ..
        } => match &left.kind {
            NodeKind::Binary {
                op: BinaryOp::Index,
                right,
                ..
            } => assert!(matches!(right.kind, NodeKind::Symbol(_))),
            other => panic!("expected an index target, found {:?}", other),
        },
        other => panic!("expected the copy-back, found {:?}", other),
    }
}
