mod common;

use pretty_assertions::assert_eq;

use glslx::ast::{build, BinaryOp, NodeKind, ParamDirection, Type};
use glslx::passes::materialize_params;
use glslx::Context;

#[test]
fn written_value_parameters_get_a_local_copy() {
    common::init_logger();
    let mut ctx = Context::new();

    // void g(float x) { x = x + 1.0; }
    let x = ctx.internal_param("x", common::float_ty(), ParamDirection::In);
    let xv = x.var;
    let g = common::function(&mut ctx, "g", Type::void(), vec![x]);

    let read = build::symbol(&mut ctx, xv);
    let one = build::float(&mut ctx, 1.0);
    let sum = build::arith(&mut ctx, BinaryOp::Add, read, one);
    let target = build::symbol(&mut ctx, xv);
    let write = build::assign(&mut ctx, target, sum);
    let body = build::block(&mut ctx, vec![write]);
    let g_def = build::function_definition(&mut ctx, g, body);

    let mut root = common::shader(&mut ctx, vec![g_def]);

    materialize_params(&mut root, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 2);

    // The copy is declared first, initialized from the parameter itself.
    let copy = common::declared_var(&body[0]);
    assert_eq!(ctx.variables.get(copy).name, "sx_x");
    match &body[0].kind {
        NodeKind::Declaration { declarators } => match &declarators[0].kind {
            NodeKind::Binary { right, .. } => {
                assert!(matches!(right.kind, NodeKind::Symbol(var) if var == xv))
            }
            other => panic!("expected an initialized declarator, found {:?}", other),
        },
        other => panic!("expected a declaration, found {:?}", other),
    }

    // Every use in the body now goes through the copy.
    match &body[1].kind {
        NodeKind::Binary { left, right, .. } => {
            assert!(matches!(left.kind, NodeKind::Symbol(var) if var == copy));
            match &right.kind {
                NodeKind::Binary { left, .. } => {
                    assert!(matches!(left.kind, NodeKind::Symbol(var) if var == copy))
                }
                other => panic!("expected the addition, found {:?}", other),
            }
        }
        other => panic!("expected the assignment, found {:?}", other),
    }
}

#[test]
fn output_parameters_are_left_alone() {
    common::init_logger();
    let mut ctx = Context::new();

    // out parameters stay writable on every target.
    let x = ctx.internal_param("x", common::float_ty(), ParamDirection::Out);
    let xv = x.var;
    let g = common::function(&mut ctx, "g", Type::void(), vec![x]);

    let target = build::symbol(&mut ctx, xv);
    let one = build::float(&mut ctx, 1.0);
    let write = build::assign(&mut ctx, target, one);
    let body = build::block(&mut ctx, vec![write]);
    let g_def = build::function_definition(&mut ctx, g, body);

    let mut root = common::shader(&mut ctx, vec![g_def]);
    let before = root.count();

    materialize_params(&mut root, &mut ctx).unwrap();

    assert_eq!(root.count(), before);
}

#[test]
fn read_only_parameters_are_left_alone() {
    common::init_logger();
    let mut ctx = Context::new();

    // void g(float x) { float y = x; }
    let x = ctx.internal_param("x", common::float_ty(), ParamDirection::In);
    let xv = x.var;
    let g = common::function(&mut ctx, "g", Type::void(), vec![x]);

    let y = common::local(&mut ctx, "y", common::float_ty());
    let read = build::symbol(&mut ctx, xv);
    let decl_y = build::declare_init(&mut ctx, y, read);
    let body = build::block(&mut ctx, vec![decl_y]);
    let g_def = build::function_definition(&mut ctx, g, body);

    let mut root = common::shader(&mut ctx, vec![g_def]);
    let before = root.count();

    materialize_params(&mut root, &mut ctx).unwrap();

    assert_eq!(root.count(), before);
}
