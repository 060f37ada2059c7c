mod common;

use pretty_assertions::assert_eq;

use glslx::ast::{build, BinaryOp, Node, NodeId, NodeKind, ParamDirection, Type, UnaryOp};
use glslx::error::Error;
use glslx::traverse::{traverse, Traverse, Traverser, VisitPhase, Visitor};
use glslx::Context;

#[derive(Default)]
struct Recorder {
    symbols: Vec<(String, bool, bool)>,
    binary_parent: Option<Option<NodeId>>,
    in_function: bool,
}

impl Visitor for Recorder {
    fn visit_symbol(&mut self, t: &mut Traverser, node: &Node) {
        if let NodeKind::Symbol(var) = &node.kind {
            let name = t.ctx.variables.get(*var).name.clone();
            self.symbols
                .push((name, t.in_lvalue(), t.in_out_parameter()));
        }
    }

    fn visit_binary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase == VisitPhase::Pre {
            if let NodeKind::Binary {
                op: BinaryOp::Add, ..
            } = &node.kind
            {
                self.binary_parent = Some(t.parent());
                self.in_function = t.current_function().is_some();
            }
        }
        Traverse::Children
    }
}

#[test]
fn lvalue_and_parent_tracking() {
    common::init_logger();
    let mut ctx = Context::new();

    let a = common::local(&mut ctx, "a", common::float_ty());
    let b = common::local(&mut ctx, "b", common::float_ty());

    let decl_a = build::declare(&mut ctx, a);
    let decl_b = build::declare(&mut ctx, b);

    // a = b + 1.0;
    let lhs = build::symbol(&mut ctx, a);
    let rhs_b = build::symbol(&mut ctx, b);
    let one = build::float(&mut ctx, 1.0);
    let sum = build::arith(&mut ctx, BinaryOp::Add, rhs_b, one);
    let assign = build::assign(&mut ctx, lhs, sum);
    let assign_id = assign.id;

    let main = common::main_definition(&mut ctx, vec![decl_a, decl_b, assign]);
    let root = common::shader(&mut ctx, vec![main]);

    let mut recorder = Recorder::default();
    let mut t = Traverser::new(&mut ctx);
    traverse(&root, &mut recorder, &mut t);
    t.finish().unwrap();

    // Declarator symbols are visited first, without flags.
    assert_eq!(
        recorder.symbols,
        vec![
            ("a".to_owned(), false, false),
            ("b".to_owned(), false, false),
            ("a".to_owned(), true, false),
            ("b".to_owned(), false, false),
        ]
    );
    assert_eq!(recorder.binary_parent, Some(Some(assign_id)));
    assert!(recorder.in_function);
}

#[test]
fn out_arguments_are_flagged() {
    common::init_logger();
    let mut ctx = Context::new();

    let x = ctx.internal_param("x", common::float_ty(), ParamDirection::Out);
    let f = common::function(&mut ctx, "f", Type::void(), vec![x]);

    let v = common::local(&mut ctx, "v", common::float_ty());
    let decl = build::declare(&mut ctx, v);
    let arg = build::symbol(&mut ctx, v);
    let call = build::call(&mut ctx, f, vec![arg]);

    let main = common::main_definition(&mut ctx, vec![decl, call]);
    let root = common::shader(&mut ctx, vec![main]);

    let mut recorder = Recorder::default();
    let mut t = Traverser::new(&mut ctx);
    traverse(&root, &mut recorder, &mut t);
    t.finish().unwrap();

    assert_eq!(
        recorder.symbols,
        vec![
            ("v".to_owned(), false, false),
            ("v".to_owned(), true, true),
        ]
    );
}

struct SkipAssignments {
    symbols_seen: usize,
}

impl Visitor for SkipAssignments {
    fn visit_symbol(&mut self, _t: &mut Traverser, _node: &Node) {
        self.symbols_seen += 1;
    }

    fn visit_binary(&mut self, _t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase == VisitPhase::Pre {
            if let NodeKind::Binary { op, .. } = &node.kind {
                if op.is_assignment() {
                    return Traverse::Skip;
                }
            }
        }
        Traverse::Children
    }
}

#[test]
fn skip_prunes_the_subtree() {
    common::init_logger();
    let mut ctx = Context::new();

    let a = common::local(&mut ctx, "a", common::float_ty());
    let decl = build::declare(&mut ctx, a);
    let lhs = build::symbol(&mut ctx, a);
    let value = build::float(&mut ctx, 2.0);
    let assign = build::assign(&mut ctx, lhs, value);

    let main = common::main_definition(&mut ctx, vec![decl, assign]);
    let root = common::shader(&mut ctx, vec![main]);

    let mut visitor = SkipAssignments { symbols_seen: 0 };
    let mut t = Traverser::new(&mut ctx);
    traverse(&root, &mut visitor, &mut t);
    t.finish().unwrap();

    // Only the declarator symbol; both sides of the assignment are skipped.
    assert_eq!(visitor.symbols_seen, 1);
}

struct Nothing;
impl Visitor for Nothing {}

#[test]
fn nesting_ceiling_is_enforced() {
    common::init_logger();
    let mut ctx = Context::new();
    ctx.limits.max_depth = 4;

    let a = common::local(&mut ctx, "a", common::float_ty());
    let decl = build::declare(&mut ctx, a);

    let mut expr = build::symbol(&mut ctx, a);
    for _ in 0..8 {
        expr = build::unary(&mut ctx, UnaryOp::Negate, expr);
    }
    let lhs = build::symbol(&mut ctx, a);
    let assign = build::assign(&mut ctx, lhs, expr);

    let main = common::main_definition(&mut ctx, vec![decl, assign]);
    let root = common::shader(&mut ctx, vec![main]);

    let mut t = Traverser::new(&mut ctx);
    traverse(&root, &mut Nothing, &mut t);

    match t.finish() {
        Err(Error::TooDeeplyNested { limit: 4, .. }) => {}
        other => panic!("expected TooDeeplyNested, got {:?}", other.map(|_| ())),
    }
}
