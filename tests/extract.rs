mod common;

use pretty_assertions::assert_eq;

use glslx::ast::{
    build, BasicType, BinaryOp, CallTarget, FunctionId, Node, NodeKind, ParamDirection, Type,
};
use glslx::passes::{extract_expressions, ExtractKinds};
use glslx::Context;

fn count_calls(node: &Node, f: FunctionId) -> usize {
    let own = matches!(
        &node.kind,
        NodeKind::Call {
            target: CallTarget::Function(id),
            ..
        } if *id == f
    ) as usize;
    own + node
        .children()
        .into_iter()
        .map(|child| count_calls(child, f))
        .sum::<usize>()
}

const BOTH: ExtractKinds = ExtractKinds {
    ternaries: true,
    commas: true,
};

#[test]
fn ternary_becomes_a_helper_call() {
    common::init_logger();
    let mut ctx = Context::new();

    let c = common::local(&mut ctx, "c", Type::scalar(BasicType::Bool));
    let a = common::local(&mut ctx, "a", common::float_ty());
    let b = common::local(&mut ctx, "b", common::float_ty());
    let x = common::local(&mut ctx, "x", common::float_ty());

    let decls = vec![
        build::declare(&mut ctx, c),
        build::declare(&mut ctx, a),
        build::declare(&mut ctx, b),
        build::declare(&mut ctx, x),
    ];

    // x = c ? a : b;
    let cond = build::symbol(&mut ctx, c);
    let then_value = build::symbol(&mut ctx, a);
    let else_value = build::symbol(&mut ctx, b);
    let ternary = build::ternary(&mut ctx, cond, then_value, else_value);
    let target = build::symbol(&mut ctx, x);
    let assign = build::assign(&mut ctx, target, ternary);

    let mut statements = decls;
    statements.push(assign);
    let main = common::main_definition(&mut ctx, statements);
    let mut root = common::shader(&mut ctx, vec![main]);

    extract_expressions(&mut root, &mut ctx, BOTH).unwrap();

    // The helper definition is hoisted before main.
    let top = common::statements(&root);
    assert_eq!(top.len(), 2);

    let helper = match &top[0].kind {
        NodeKind::FunctionDefinition { function, .. } => *function,
        other => panic!("expected the helper definition, found {:?}", other),
    };
    let record = ctx.functions.get(helper);
    assert!(record.name.starts_with("sx_expr"));
    assert_eq!(record.return_type.basic, BasicType::Float);

    // Captured locals become value parameters, in declaration order.
    let captured: Vec<_> = record.parameters.iter().map(|p| (p.var, p.direction)).collect();
    assert_eq!(
        captured,
        vec![
            (c, ParamDirection::In),
            (a, ParamDirection::In),
            (b, ParamDirection::In),
        ]
    );

    // The assignment now calls the helper with the captures.
    let body = common::body_statements(&top[1]);
    match &body[4].kind {
        NodeKind::Binary { right, .. } => match &right.kind {
            NodeKind::Call {
                target: CallTarget::Function(f),
                args,
            } => {
                assert_eq!(*f, helper);
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected the helper call, found {:?}", other),
        },
        other => panic!("expected the assignment, found {:?}", other),
    }

    // The helper body is an if/else returning either branch value.
    let helper_body = common::body_statements(&top[0]);
    assert_eq!(helper_body.len(), 1);
    assert!(matches!(helper_body[0].kind, NodeKind::If { .. }));
}

#[test]
fn written_captures_are_passed_inout() {
    common::init_logger();
    let mut ctx = Context::new();

    let c = common::local(&mut ctx, "c", Type::scalar(BasicType::Bool));
    let a = common::local(&mut ctx, "a", common::float_ty());
    let x = common::local(&mut ctx, "x", common::float_ty());

    let decls = vec![
        build::declare(&mut ctx, c),
        build::declare(&mut ctx, a),
        build::declare(&mut ctx, x),
    ];

    // x = c ? (a = 1.0) : a;
    let one = build::float(&mut ctx, 1.0);
    let write_target = build::symbol(&mut ctx, a);
    let write = build::assign(&mut ctx, write_target, one);
    let read = build::symbol(&mut ctx, a);
    let cond = build::symbol(&mut ctx, c);
    let ternary = build::ternary(&mut ctx, cond, write, read);
    let target = build::symbol(&mut ctx, x);
    let assign = build::assign(&mut ctx, target, ternary);

    let mut statements = decls;
    statements.push(assign);
    let main = common::main_definition(&mut ctx, statements);
    let mut root = common::shader(&mut ctx, vec![main]);

    extract_expressions(&mut root, &mut ctx, BOTH).unwrap();

    let top = common::statements(&root);
    let helper = match &top[0].kind {
        NodeKind::FunctionDefinition { function, .. } => *function,
        other => panic!("expected the helper definition, found {:?}", other),
    };

    let direction_of = |var| {
        ctx.functions
            .get(helper)
            .parameters
            .iter()
            .find(|p| p.var == var)
            .map(|p| p.direction)
    };
    assert_eq!(direction_of(c), Some(ParamDirection::In));
    assert_eq!(direction_of(a), Some(ParamDirection::InOut));
}

#[test]
fn calls_in_branches_are_moved_not_duplicated() {
    common::init_logger();
    let mut ctx = Context::new();

    let p = ctx.internal_param("p", common::float_ty(), ParamDirection::In);
    let g = common::function(&mut ctx, "g", common::float_ty(), vec![p]);

    let c = common::local(&mut ctx, "c", Type::scalar(BasicType::Bool));
    let a = common::local(&mut ctx, "a", common::float_ty());
    let x = common::local(&mut ctx, "x", common::float_ty());

    let decls = vec![
        build::declare(&mut ctx, c),
        build::declare(&mut ctx, a),
        build::declare(&mut ctx, x),
    ];

    // x = c ? g(a) : a; g may have effects, so it must end up in the helper
    // exactly once.
    let arg = build::symbol(&mut ctx, a);
    let call = build::call(&mut ctx, g, vec![arg]);
    let read = build::symbol(&mut ctx, a);
    let cond = build::symbol(&mut ctx, c);
    let ternary = build::ternary(&mut ctx, cond, call, read);
    let target = build::symbol(&mut ctx, x);
    let assign = build::assign(&mut ctx, target, ternary);

    let mut statements = decls;
    statements.push(assign);
    let main = common::main_definition(&mut ctx, statements);
    let mut root = common::shader(&mut ctx, vec![main]);

    extract_expressions(&mut root, &mut ctx, BOTH).unwrap();

    assert_eq!(count_calls(&root, g), 1);

    // The surviving call sits in the helper, inside the taken branch.
    let top = common::statements(&root);
    assert_eq!(top.len(), 2);
    let helper_body = common::body_statements(&top[0]);
    assert_eq!(count_calls(&helper_body[0], g), 1);
}

#[test]
fn comma_sequence_is_extracted() {
    common::init_logger();
    let mut ctx = Context::new();

    let a = common::local(&mut ctx, "a", common::float_ty());
    let b = common::local(&mut ctx, "b", common::float_ty());
    let x = common::local(&mut ctx, "x", common::float_ty());

    let decls = vec![
        build::declare(&mut ctx, a),
        build::declare(&mut ctx, b),
        build::declare(&mut ctx, x),
    ];

    // x = (a = 1.0, b);
    let one = build::float(&mut ctx, 1.0);
    let write_target = build::symbol(&mut ctx, a);
    let write = build::assign(&mut ctx, write_target, one);
    let second = build::symbol(&mut ctx, b);
    let sequence = build::comma(&mut ctx, write, second);
    let target = build::symbol(&mut ctx, x);
    let assign = build::assign(&mut ctx, target, sequence);

    let mut statements = decls;
    statements.push(assign);
    let main = common::main_definition(&mut ctx, statements);
    let mut root = common::shader(&mut ctx, vec![main]);

    extract_expressions(&mut root, &mut ctx, BOTH).unwrap();

    let top = common::statements(&root);
    assert_eq!(top.len(), 2);

    // First statement evaluates the left side, second returns the right.
    let helper_body = common::body_statements(&top[0]);
    assert_eq!(helper_body.len(), 2);
    assert!(matches!(
        helper_body[0].kind,
        NodeKind::Binary {
            op: BinaryOp::Assign,
            ..
        }
    ));
    assert!(matches!(helper_body[1].kind, NodeKind::Branch { .. }));
}

#[test]
fn disabled_kinds_leave_the_tree_alone() {
    common::init_logger();
    let mut ctx = Context::new();

    let c = common::local(&mut ctx, "c", Type::scalar(BasicType::Bool));
    let x = common::local(&mut ctx, "x", common::float_ty());
    let decl_c = build::declare(&mut ctx, c);
    let decl_x = build::declare(&mut ctx, x);

    let cond = build::symbol(&mut ctx, c);
    let one = build::float(&mut ctx, 1.0);
    let two = build::float(&mut ctx, 2.0);
    let ternary = build::ternary(&mut ctx, cond, one, two);
    let target = build::symbol(&mut ctx, x);
    let assign = build::assign(&mut ctx, target, ternary);

    let main = common::main_definition(&mut ctx, vec![decl_c, decl_x, assign]);
    let mut root = common::shader(&mut ctx, vec![main]);
    let before = root.count();

    extract_expressions(&mut root, &mut ctx, ExtractKinds::default()).unwrap();

    assert_eq!(root.count(), before);
}
