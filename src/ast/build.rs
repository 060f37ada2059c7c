//! Node construction helpers.
//!
//! Passes and tests build trees through these instead of spelling out node
//! literals; every helper allocates its id from the compilation context and
//! derives the node type from its operands where that is unambiguous.

use super::*;
use crate::context::Context;

fn node(ctx: &mut Context, ty: Type, kind: NodeKind) -> Node {
    Node {
        id: ctx.make_node_id(),
        ty,
        loc: SourceLoc::NONE,
        kind,
    }
}

/// Reference to a variable; the node type is copied from the record
pub fn symbol(ctx: &mut Context, var: VariableId) -> Node {
    let ty = ctx.variables.get(var).ty.clone();
    node(ctx, ty, NodeKind::Symbol(var))
}

/// Float literal
pub fn float(ctx: &mut Context, value: f32) -> Node {
    node(
        ctx,
        Type::scalar(BasicType::Float),
        NodeKind::Constant(ConstantValue(vec![Scalar::Float(value)])),
    )
}

/// Signed integer literal
pub fn int(ctx: &mut Context, value: i32) -> Node {
    node(
        ctx,
        Type::scalar(BasicType::Int),
        NodeKind::Constant(ConstantValue(vec![Scalar::Int(value)])),
    )
}

/// Unsigned integer literal
pub fn uint(ctx: &mut Context, value: u32) -> Node {
    node(
        ctx,
        Type::scalar(BasicType::UInt),
        NodeKind::Constant(ConstantValue(vec![Scalar::UInt(value)])),
    )
}

/// Boolean literal
pub fn boolean(ctx: &mut Context, value: bool) -> Node {
    node(
        ctx,
        Type::scalar(BasicType::Bool),
        NodeKind::Constant(ConstantValue(vec![Scalar::Bool(value)])),
    )
}

/// Unary operation; result type follows the operand
pub fn unary(ctx: &mut Context, op: UnaryOp, operand: Node) -> Node {
    let ty = match op {
        UnaryOp::LogicalNot => Type::scalar(BasicType::Bool),
        _ => operand.ty.clone(),
    };

    node(
        ctx,
        ty,
        NodeKind::Unary {
            op,
            operand: Box::new(operand),
        },
    )
}

/// Binary operation with an explicit result type
pub fn binary(ctx: &mut Context, op: BinaryOp, left: Node, right: Node, ty: Type) -> Node {
    node(
        ctx,
        ty,
        NodeKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    )
}

/// Componentwise binary operation; result type follows the wider operand
pub fn arith(ctx: &mut Context, op: BinaryOp, left: Node, right: Node) -> Node {
    let ty = if left.ty.component_count() >= right.ty.component_count() {
        left.ty.clone()
    } else {
        right.ty.clone()
    };
    binary(ctx, op, left, right, ty)
}

/// Comparison; result type is bool
pub fn compare(ctx: &mut Context, op: BinaryOp, left: Node, right: Node) -> Node {
    binary(ctx, op, left, right, Type::scalar(BasicType::Bool))
}

/// Plain assignment; result type follows the target
pub fn assign(ctx: &mut Context, target: Node, value: Node) -> Node {
    let ty = target.ty.clone();
    binary(ctx, BinaryOp::Assign, target, value, ty)
}

/// Sequence (comma) expression; yields the right operand
pub fn comma(ctx: &mut Context, left: Node, right: Node) -> Node {
    let ty = right.ty.clone();
    binary(ctx, BinaryOp::Comma, left, right, ty)
}

/// Array or vector indexing
pub fn index(ctx: &mut Context, operand: Node, idx: Node) -> Node {
    let ty = if operand.ty.is_array() {
        operand.ty.element_type()
    } else {
        operand.ty.component_type()
    };
    binary(ctx, BinaryOp::Index, operand, idx, ty)
}

/// Struct or interface block field access by constant field index
pub fn index_field(ctx: &mut Context, operand: Node, field: u32) -> Node {
    let ty = operand
        .ty
        .struct_id
        .map(|sid| ctx.structs.get(sid).fields[field as usize].ty.clone())
        .unwrap_or_else(Type::void);

    let idx = int(ctx, field as i32);
    binary(ctx, BinaryOp::IndexStruct, operand, idx, ty)
}

/// Vector component selection
pub fn swizzle(ctx: &mut Context, operand: Node, components: Vec<u8>) -> Node {
    let basic = operand.ty.basic;
    let ty = if components.len() == 1 {
        Type::scalar(basic)
    } else {
        Type::vector(basic, components.len() as u8)
    };

    node(
        ctx,
        ty,
        NodeKind::Swizzle {
            operand: Box::new(operand),
            components,
        },
    )
}

/// Conditional expression
pub fn ternary(ctx: &mut Context, condition: Node, true_expr: Node, false_expr: Node) -> Node {
    let ty = true_expr.ty.clone();
    node(
        ctx,
        ty,
        NodeKind::Ternary {
            condition: Box::new(condition),
            true_expr: Box::new(true_expr),
            false_expr: Box::new(false_expr),
        },
    )
}

/// Call to a user-defined or synthesized function
pub fn call(ctx: &mut Context, function: FunctionId, args: Vec<Node>) -> Node {
    let ty = ctx.functions.get(function).return_type.clone();
    node(
        ctx,
        ty,
        NodeKind::Call {
            target: CallTarget::Function(function),
            args,
        },
    )
}

/// Builtin function call with an explicit result type
pub fn call_builtin(ctx: &mut Context, op: BuiltinOp, args: Vec<Node>, ty: Type) -> Node {
    node(
        ctx,
        ty,
        NodeKind::Call {
            target: CallTarget::Builtin(op),
            args,
        },
    )
}

/// Type constructor call
pub fn construct(ctx: &mut Context, ty: Type, args: Vec<Node>) -> Node {
    node(
        ctx,
        ty,
        NodeKind::Call {
            target: CallTarget::Constructor,
            args,
        },
    )
}

/// Declaration of a single uninitialized variable
pub fn declare(ctx: &mut Context, var: VariableId) -> Node {
    let sym = symbol(ctx, var);
    node(
        ctx,
        Type::void(),
        NodeKind::Declaration {
            declarators: vec![sym],
        },
    )
}

/// Declaration of a single variable with an initializer
pub fn declare_init(ctx: &mut Context, var: VariableId, value: Node) -> Node {
    let sym = symbol(ctx, var);
    let ty = sym.ty.clone();
    let init = binary(ctx, BinaryOp::Initialize, sym, value, ty);
    node(
        ctx,
        Type::void(),
        NodeKind::Declaration {
            declarators: vec![init],
        },
    )
}

/// Declaration with several declarators, as the parser may produce before
/// the separate-declarations pass
pub fn declare_many(ctx: &mut Context, declarators: Vec<Node>) -> Node {
    node(ctx, Type::void(), NodeKind::Declaration { declarators })
}

/// Statement list
pub fn block(ctx: &mut Context, statements: Vec<Node>) -> Node {
    node(ctx, Type::void(), NodeKind::Block { statements })
}

/// `if` statement; both branches must be blocks
pub fn if_stmt(ctx: &mut Context, condition: Node, then_block: Node, else_block: Option<Node>) -> Node {
    node(
        ctx,
        Type::void(),
        NodeKind::If {
            condition: Box::new(condition),
            then_block: Box::new(then_block),
            else_block: else_block.map(Box::new),
        },
    )
}

/// C-style counted loop
pub fn for_loop(
    ctx: &mut Context,
    init: Option<Node>,
    condition: Option<Node>,
    increment: Option<Node>,
    body: Node,
) -> Node {
    node(
        ctx,
        Type::void(),
        NodeKind::Loop {
            kind: LoopKind::For,
            init: init.map(Box::new),
            condition: condition.map(Box::new),
            increment: increment.map(Box::new),
            body: Box::new(body),
        },
    )
}

/// `while` loop
pub fn while_loop(ctx: &mut Context, condition: Node, body: Node) -> Node {
    node(
        ctx,
        Type::void(),
        NodeKind::Loop {
            kind: LoopKind::While,
            init: None,
            condition: Some(Box::new(condition)),
            increment: None,
            body: Box::new(body),
        },
    )
}

/// `return`, with or without a value
pub fn ret(ctx: &mut Context, operand: Option<Node>) -> Node {
    node(
        ctx,
        Type::void(),
        NodeKind::Branch {
            kind: BranchKind::Return,
            operand: operand.map(Box::new),
        },
    )
}

/// `break`, `continue` or `discard`
pub fn branch(ctx: &mut Context, kind: BranchKind) -> Node {
    node(ctx, Type::void(), NodeKind::Branch { kind, operand: None })
}

/// Function definition; the body must be a block
pub fn function_definition(ctx: &mut Context, function: FunctionId, body: Node) -> Node {
    node(
        ctx,
        Type::void(),
        NodeKind::FunctionDefinition {
            function,
            body: Box::new(body),
        },
    )
}

/// Standalone function prototype
pub fn function_prototype(ctx: &mut Context, function: FunctionId) -> Node {
    node(ctx, Type::void(), NodeKind::FunctionPrototype { function })
}
