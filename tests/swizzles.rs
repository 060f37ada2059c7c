mod common;

use pretty_assertions::assert_eq;

use glslx::ast::{build, ArraySize, BinaryOp, Node, NodeKind, UnaryOp};
use glslx::error::Error;
use glslx::passes::split_swizzles;
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

fn store_components(stmt: &Node) -> (Vec<u8>, Vec<u8>) {
    match &stmt.kind {
        NodeKind::Binary {
            op: BinaryOp::Assign,
            left,
            right,
        } => {
            let target = match &left.kind {
                NodeKind::Swizzle { components, .. } => components.clone(),
                other => panic!("expected a swizzle target, found {:?}", other),
            };
            let source = match &right.kind {
                NodeKind::Swizzle { components, .. } => components.clone(),
                other => panic!("expected a swizzle source, found {:?}", other),
            };
            (target, source)
        }
        other => panic!("expected an assignment, found {:?}", other),
    }
}

#[test]
fn reversed_swizzle_store_is_split() {
    common::init_logger();
    let mut ctx = Context::new();

    let v = common::local(&mut ctx, "v", common::vec_ty(2));
    let u = common::local(&mut ctx, "u", common::vec_ty(2));
    let decl_v = build::declare(&mut ctx, v);
    let decl_u = build::declare(&mut ctx, u);

    // v.yx = u;
    let operand = build::symbol(&mut ctx, v);
    let target = build::swizzle(&mut ctx, operand, vec![1, 0]);
    let value = build::symbol(&mut ctx, u);
    let store = build::assign(&mut ctx, target, value);

    let main = common::main_definition(&mut ctx, vec![decl_v, decl_u, store]);
    let mut root = common::shader(&mut ctx, vec![main]);

    split_swizzles(&mut root, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 5);

    // sx0 = u, then v.y = sx0.x and v.x = sx0.y.
    let temp = common::declared_var(&body[2]);
    assert!(ctx.variables.get(temp).name.starts_with("sx"));
    assert_eq!(store_components(&body[3]), (vec![1], vec![0]));
    assert_eq!(store_components(&body[4]), (vec![0], vec![1]));
}

#[test]
fn compound_swizzle_store_is_lowered_then_split() {
    common::init_logger();
    let mut ctx = Context::new();

    let v = common::local(&mut ctx, "v", common::vec_ty(3));
    let decl = build::declare(&mut ctx, v);

    // v.xy += 1.0;
    let operand = build::symbol(&mut ctx, v);
    let target = build::swizzle(&mut ctx, operand, vec![0, 1]);
    let one = build::float(&mut ctx, 1.0);
    let ty = target.ty.clone();
    let store = build::binary(&mut ctx, BinaryOp::AddAssign, target, one, ty);

    let main = common::main_definition(&mut ctx, vec![decl, store]);
    let mut root = common::shader(&mut ctx, vec![main]);

    split_swizzles(&mut root, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 4);

    // The temporary holds v.xy + 1.0.
    match &body[1].kind {
        NodeKind::Declaration { declarators } => match &declarators[0].kind {
            NodeKind::Binary { right, .. } => match &right.kind {
                NodeKind::Binary {
                    op: BinaryOp::Add, ..
                } => {}
                other => panic!("expected the lowered addition, found {:?}", other),
            },
            other => panic!("expected an initialized declarator, found {:?}", other),
        },
        other => panic!("expected a declaration, found {:?}", other),
    }

    assert_eq!(store_components(&body[2]), (vec![0], vec![0]));
    assert_eq!(store_components(&body[3]), (vec![1], vec![1]));
}

#[test]
fn indexed_store_bases_evaluate_their_index_once() {
    common::init_logger();
    let mut ctx = Context::new();

    // m[i++].yx = u; the increment must survive exactly once.
    let element = common::vec_ty(2);
    let m = common::local(&mut ctx, "m", element.with_array(ArraySize::Fixed(4)));
    let i = common::local(&mut ctx, "i", common::int_ty());
    let u = common::local(&mut ctx, "u", common::vec_ty(2));
    let decl_m = build::declare(&mut ctx, m);
    let decl_i = build::declare(&mut ctx, i);
    let decl_u = build::declare(&mut ctx, u);

    let operand = build::symbol(&mut ctx, m);
    let counter = build::symbol(&mut ctx, i);
    let bump = build::unary(&mut ctx, UnaryOp::PostIncrement, counter);
    let base = build::index(&mut ctx, operand, bump);
    let target = build::swizzle(&mut ctx, base, vec![1, 0]);
    let value = build::symbol(&mut ctx, u);
    let store = build::assign(&mut ctx, target, value);

    let main = common::main_definition(&mut ctx, vec![decl_m, decl_i, decl_u, store]);
    let mut root = common::shader(&mut ctx, vec![main]);

    split_swizzles(&mut root, &mut ctx).unwrap();

    assert_eq!(count_increments(&root), 1);

    // Three declarations, the value temporary, the hoisted index, two stores.
    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 7);
    assert_eq!(store_components(&body[5]), (vec![1], vec![0]));
    assert_eq!(store_components(&body[6]), (vec![0], vec![1]));
}

#[test]
fn compound_indexed_stores_evaluate_their_index_once() {
    common::init_logger();
    let mut ctx = Context::new();

    // m[i++].xy += 1.0; lowering plus splitting still runs `i++` once.
    let element = common::vec_ty(3);
    let m = common::local(&mut ctx, "m", element.with_array(ArraySize::Fixed(4)));
    let i = common::local(&mut ctx, "i", common::int_ty());
    let decl_m = build::declare(&mut ctx, m);
    let decl_i = build::declare(&mut ctx, i);

    let operand = build::symbol(&mut ctx, m);
    let counter = build::symbol(&mut ctx, i);
    let bump = build::unary(&mut ctx, UnaryOp::PostIncrement, counter);
    let base = build::index(&mut ctx, operand, bump);
    let target = build::swizzle(&mut ctx, base, vec![0, 1]);
    let one = build::float(&mut ctx, 1.0);
    let ty = target.ty.clone();
    let store = build::binary(&mut ctx, BinaryOp::AddAssign, target, one, ty);

    let main = common::main_definition(&mut ctx, vec![decl_m, decl_i, store]);
    let mut root = common::shader(&mut ctx, vec![main]);

    split_swizzles(&mut root, &mut ctx).unwrap();

    assert_eq!(count_increments(&root), 1);

    // Two declarations, hoisted index, value temporary, two stores.
    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 6);
    assert_eq!(store_components(&body[4]), (vec![0], vec![0]));
    assert_eq!(store_components(&body[5]), (vec![1], vec![1]));
}

#[test]
fn single_component_stores_pass_through() {
    common::init_logger();
    let mut ctx = Context::new();

    let v = common::local(&mut ctx, "v", common::vec_ty(2));
    let decl = build::declare(&mut ctx, v);

    let operand = build::symbol(&mut ctx, v);
    let target = build::swizzle(&mut ctx, operand, vec![0]);
    let value = build::float(&mut ctx, 1.0);
    let store = build::assign(&mut ctx, target, value);

    let main = common::main_definition(&mut ctx, vec![decl, store]);
    let mut root = common::shader(&mut ctx, vec![main]);

    split_swizzles(&mut root, &mut ctx).unwrap();

    let body = common::body_statements(&common::statements(&root)[0]);
    assert_eq!(body.len(), 2);
}

#[test]
fn nested_swizzle_store_is_rejected() {
    common::init_logger();
    let mut ctx = Context::new();

    let v = common::local(&mut ctx, "v", common::vec_ty(2));
    let w = common::local(&mut ctx, "w", common::vec_ty(2));
    let u = common::local(&mut ctx, "u", common::vec_ty(2));
    let decl_v = build::declare(&mut ctx, v);
    let decl_w = build::declare(&mut ctx, w);
    let decl_u = build::declare(&mut ctx, u);

    // w = (v.xy = u);
    let operand = build::symbol(&mut ctx, v);
    let inner_target = build::swizzle(&mut ctx, operand, vec![0, 1]);
    let value = build::symbol(&mut ctx, u);
    let inner = build::assign(&mut ctx, inner_target, value);
    let outer_target = build::symbol(&mut ctx, w);
    let outer = build::assign(&mut ctx, outer_target, inner);

    let main = common::main_definition(&mut ctx, vec![decl_v, decl_w, decl_u, outer]);
    let mut root = common::shader(&mut ctx, vec![main]);

    match split_swizzles(&mut root, &mut ctx) {
        Err(Error::NestedSwizzleAssignment) => {}
        other => panic!(
            "expected NestedSwizzleAssignment, got {:?}",
            other.map(|_| ())
        ),
    }
}
