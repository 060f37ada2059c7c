mod common;

use pretty_assertions::assert_eq;

use glslx::ast::{build, BasicType, BinaryOp, ParamDirection, Type};
use glslx::{translate, CompileOptions, Context, SymbolTable, Target};

#[test]
fn gathered_uniforms_become_a_bound_block() {
    common::init_logger();
    let mut ctx = Context::new();
    let mut symbols = SymbolTable::new();

    let scale = common::uniform(&mut ctx, "scale", common::float_ty());
    symbols.declare_global("scale", scale);
    let decl_scale = build::declare(&mut ctx, scale);

    // float x = scale * 2.0;
    let x = common::local(&mut ctx, "x", common::float_ty());
    let scale_use = build::symbol(&mut ctx, scale);
    let two = build::float(&mut ctx, 2.0);
    let product = build::arith(&mut ctx, BinaryOp::Mul, scale_use, two);
    let decl_x = build::declare_init(&mut ctx, x, product);

    let main = common::main_definition(&mut ctx, vec![decl_x]);
    let mut root = common::shader(&mut ctx, vec![decl_scale, main]);

    let options = CompileOptions::builder()
        .target(Target::Wgsl)
        .build()
        .unwrap();
    let output = translate(&mut root, &mut ctx, &mut symbols, &options).unwrap();

    let expected = "\
struct Uniforms
{
    scale : f32,
};

@group(0) @binding(0) var<uniform> sx_uniforms : Uniforms;
fn main()
{
    var x : f32 = (sx_uniforms.scale * 2.0);
}

";
    assert_eq!(output, expected);
}

#[test]
fn output_parameters_become_function_pointers() {
    common::init_logger();
    let mut ctx = Context::new();
    let mut symbols = SymbolTable::new();

    let x = ctx.internal_param("x", common::float_ty(), ParamDirection::InOut);
    let xv = x.var;
    let f = common::function(&mut ctx, "f", Type::void(), vec![x]);

    let target = build::symbol(&mut ctx, xv);
    let one = build::float(&mut ctx, 1.0);
    let write = build::assign(&mut ctx, target, one);
    let f_body = build::block(&mut ctx, vec![write]);
    let f_def = build::function_definition(&mut ctx, f, f_body);

    let v = common::local(&mut ctx, "v", common::float_ty());
    let decl_v = build::declare(&mut ctx, v);
    let arg = build::symbol(&mut ctx, v);
    let call = build::call(&mut ctx, f, vec![arg]);

    let main = common::main_definition(&mut ctx, vec![decl_v, call]);
    let mut root = common::shader(&mut ctx, vec![f_def, main]);

    let options = CompileOptions::builder()
        .target(Target::Wgsl)
        .build()
        .unwrap();
    let output = translate(&mut root, &mut ctx, &mut symbols, &options).unwrap();

    // Uses inside the callee dereference; the call site takes the address.
    let expected = "\
fn f(x : ptr<function, f32>)
{
    (*x) = 1.0;
}

fn main()
{
    var v : f32;
    f(&v);
}

";
    assert_eq!(output, expected);
}

#[test]
fn ternaries_are_routed_through_a_helper() {
    common::init_logger();
    let mut ctx = Context::new();
    let mut symbols = SymbolTable::new();

    let c = common::local(&mut ctx, "c", Type::scalar(BasicType::Bool));
    let x = common::local(&mut ctx, "x", common::float_ty());
    let decl_c = build::declare(&mut ctx, c);
    let decl_x = build::declare(&mut ctx, x);

    // x = c ? 1.0 : 2.0;
    let cond = build::symbol(&mut ctx, c);
    let one = build::float(&mut ctx, 1.0);
    let two = build::float(&mut ctx, 2.0);
    let ternary = build::ternary(&mut ctx, cond, one, two);
    let target = build::symbol(&mut ctx, x);
    let assign = build::assign(&mut ctx, target, ternary);

    let main = common::main_definition(&mut ctx, vec![decl_c, decl_x, assign]);
    let mut root = common::shader(&mut ctx, vec![main]);

    let options = CompileOptions::builder()
        .target(Target::Wgsl)
        .build()
        .unwrap();
    let output = translate(&mut root, &mut ctx, &mut symbols, &options).unwrap();

    let expected = "\
fn sx_expr0(c : bool) -> f32
{
    if (c)
    {
        return 1.0;
    }
    else
    {
        return 2.0;
    }
}

fn main()
{
    var c : bool;
    var x : f32;
    x = sx_expr0(c);
}

";
    assert_eq!(output, expected);
}
