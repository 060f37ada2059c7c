#![allow(dead_code)]

use glslx::ast::{
    build, BasicType, Function, FunctionId, Node, NodeKind, Parameter, Qualifier, SymbolKind,
    Type, VariableId,
};
use glslx::Context;

pub fn init_logger() {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init()
        .ok();
}

pub fn local(ctx: &mut Context, name: &str, ty: Type) -> VariableId {
    ctx.variables.declare(name, ty, SymbolKind::UserDefined)
}

pub fn uniform(ctx: &mut Context, name: &str, ty: Type) -> VariableId {
    ctx.variables.declare(
        name,
        ty.with_qualifier(Qualifier::Uniform),
        SymbolKind::UserDefined,
    )
}

pub fn function(
    ctx: &mut Context,
    name: &str,
    return_type: Type,
    parameters: Vec<Parameter>,
) -> FunctionId {
    ctx.functions.declare(Function {
        name: name.to_owned(),
        return_type,
        parameters,
        kind: SymbolKind::UserDefined,
    })
}

/// `void main()` with the given body statements
pub fn main_definition(ctx: &mut Context, statements: Vec<Node>) -> Node {
    let main = function(ctx, "main", Type::void(), Vec::new());
    let body = build::block(ctx, statements);
    build::function_definition(ctx, main, body)
}

/// Translation-unit root holding the given file-scope statements
pub fn shader(ctx: &mut Context, statements: Vec<Node>) -> Node {
    build::block(ctx, statements)
}

pub fn float_ty() -> Type {
    Type::scalar(BasicType::Float)
}

pub fn vec_ty(size: u8) -> Type {
    Type::vector(BasicType::Float, size)
}

pub fn int_ty() -> Type {
    Type::scalar(BasicType::Int)
}

pub fn statements(node: &Node) -> &[Node] {
    match &node.kind {
        NodeKind::Block { statements } => statements,
        other => panic!("expected a block, found {:?}", other),
    }
}

/// Body statements of a function definition node
pub fn body_statements(node: &Node) -> &[Node] {
    match &node.kind {
        NodeKind::FunctionDefinition { body, .. } => statements(body),
        other => panic!("expected a function definition, found {:?}", other),
    }
}

/// Variable a single-declarator declaration statement declares
pub fn declared_var(node: &Node) -> VariableId {
    match &node.kind {
        NodeKind::Declaration { declarators } => match declarators.as_slice() {
            [d] => match &d.kind {
                NodeKind::Symbol(var) => *var,
                NodeKind::Binary { left, .. } => match &left.kind {
                    NodeKind::Symbol(var) => *var,
                    other => panic!("malformed declarator {:?}", other),
                },
                other => panic!("malformed declarator {:?}", other),
            },
            other => panic!("expected a single declarator, found {}", other.len()),
        },
        other => panic!("expected a declaration, found {:?}", other),
    }
}
