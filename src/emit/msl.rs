//! MSL output backend.
//!
//! Scalar and vector type names match HLSL's, so the expression grammar here
//! stays close to the HLSL backend; the differences are reference-style
//! output parameters (`thread T&`), `as_type` bit casts, texture member
//! syntax with `level()`/`bias()`/`gradient2d()` option arguments, and
//! `discard_fragment()`. Entry-point and binding wiring is outside this
//! translation; globals are emitted at file scope in declaration order.

use crate::ast::{
    ArraySize, BasicType, BinaryOp, BuiltinOp, CallTarget, ConstantValue, Node, NodeKind,
    ParamDirection, Qualifier, SamplerKind, Scalar, Type, UnaryOp, VariableId,
};
use crate::builtins::EmulationRegistry;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::sink::Sink;

use super::{
    field_access, format_float, ordered_structs, referenced_structs, Mapping, Target, INDENT_WIDTH,
};

struct Emitter<'c> {
    ctx: &'c Context,
    out: Sink,
    indent: usize,
    emulation: EmulationRegistry,
}

pub fn emit(root: &Node, ctx: &Context) -> Result<String> {
    let mut emitter = Emitter {
        ctx,
        out: Sink::new(),
        indent: 0,
        emulation: EmulationRegistry::new(Target::Msl),
    };
    emitter.translation_unit(root)?;

    let mut full = Sink::new();
    full.push("#include <metal_stdlib>\nusing namespace metal;\n\n");

    let wanted = referenced_structs(root, ctx);
    if !wanted.is_empty() {
        let mut structs = Emitter {
            ctx,
            out: Sink::new(),
            indent: 0,
            emulation: EmulationRegistry::new(Target::Msl),
        };
        for id in ordered_structs(ctx, &wanted) {
            structs.struct_declaration(id)?;
        }
        full.push_sink(&structs.out);
    }

    if emitter.emulation.any_used() {
        emitter.emulation.emit_definitions(&mut full);
        full.push("\n");
    }

    full.push_sink(&emitter.out);
    Ok(full.into_string())
}

impl<'c> Emitter<'c> {
    fn unsupported(&self, construct: &str) -> Error {
        Error::UnsupportedConstruct {
            target: Target::Msl,
            construct: construct.to_owned(),
        }
    }

    fn line_start(&mut self) {
        self.out.push_repeated(' ', self.indent * INDENT_WIDTH);
    }

    fn type_name(&self, ty: &Type) -> Result<String> {
        let base = match ty.basic {
            BasicType::Void => "void".to_owned(),
            BasicType::Float => "float".to_owned(),
            BasicType::Int => "int".to_owned(),
            BasicType::UInt => "uint".to_owned(),
            BasicType::Bool => "bool".to_owned(),
            BasicType::Sampler(kind) => {
                return Ok(match kind {
                    SamplerKind::Sampler2D => "texture2d<float>",
                    SamplerKind::Sampler3D => "texture3d<float>",
                    SamplerKind::SamplerCube => "texturecube<float>",
                    SamplerKind::Sampler2DArray => "texture2d_array<float>",
                    SamplerKind::Sampler2DShadow => "depth2d<float>",
                }
                .to_owned())
            }
            BasicType::Struct | BasicType::InterfaceBlock => {
                let id = ty
                    .struct_id
                    .ok_or_else(|| Error::Internal("struct type without field list".to_owned()))?;
                return Ok(self.ctx.structs.get(id).name.clone());
            }
        };

        if ty.is_matrix() {
            Ok(format!(
                "{}{}x{}",
                base, ty.secondary_size, ty.primary_size
            ))
        } else if ty.is_vector() {
            Ok(format!("{}{}", base, ty.primary_size))
        } else {
            Ok(base)
        }
    }

    fn declarator(&self, ty: &Type, name: &str) -> Result<String> {
        let mut s = format!("{} {}", self.type_name(ty)?, name);
        for size in &ty.array_sizes {
            match size {
                ArraySize::Fixed(n) => s.push_str(&format!("[{}]", n)),
                ArraySize::Unsized => return Err(self.unsupported("runtime-sized array")),
            }
        }
        Ok(s)
    }

    fn struct_declaration(&mut self, id: crate::ast::StructId) -> Result<()> {
        let def = self.ctx.structs.get(id);
        self.out.push(&format!("struct {}\n{{\n", def.name));
        for field in &def.fields {
            self.out.push("    ");
            let decl = self.declarator(&field.ty, &field.name)?;
            self.out.push(&decl);
            self.out.push(";\n");
        }
        self.out.push("};\n\n");
        Ok(())
    }

    fn translation_unit(&mut self, root: &Node) -> Result<()> {
        let statements = match &root.kind {
            NodeKind::Block { statements } => statements,
            _ => return Err(Error::Internal("translation unit is not a block".to_owned())),
        };

        for stmt in statements {
            match &stmt.kind {
                NodeKind::Declaration { .. } => self.global_declaration(stmt)?,
                NodeKind::FunctionDefinition { .. } => self.function_definition(stmt)?,
                NodeKind::FunctionPrototype { function } => {
                    let sig = self.signature(*function)?;
                    self.out.push(&sig);
                    self.out.push(";\n\n");
                }
                _ => return Err(Error::Internal("statement at file scope".to_owned())),
            }
        }
        Ok(())
    }

    fn global_declaration(&mut self, stmt: &Node) -> Result<()> {
        let declarators = match &stmt.kind {
            NodeKind::Declaration { declarators } => declarators,
            _ => unreachable!(),
        };

        for declarator in declarators {
            let (var, init) = split_declarator(declarator)?;
            let record = self.ctx.variables.get(var);
            let ty = record.ty.clone();

            match (ty.qualifier, ty.basic) {
                (Qualifier::Uniform, BasicType::InterfaceBlock) => {
                    let id = ty.struct_id.ok_or_else(|| {
                        Error::Internal("interface block without field list".to_owned())
                    })?;
                    self.struct_declaration(id)?;
                    let block = self.ctx.structs.get(id).name.clone();
                    self.out
                        .push(&format!("constant {}& {} [[buffer(0)]];\n", block, record.name));
                }
                (Qualifier::Uniform, BasicType::Sampler(_)) => {
                    let decl = self.declarator(&ty, &record.name)?;
                    self.out.push(&decl);
                    self.out.push(";\n");
                    self.out
                        .push(&format!("sampler {}_sampler;\n", record.name));
                }
                (Qualifier::Const, _) => {
                    let decl = self.declarator(&ty, &record.name)?;
                    self.out.push("constant ");
                    self.out.push(&decl);
                    if let Some(init) = init {
                        self.out.push(" = ");
                        self.expr(init)?;
                    }
                    self.out.push(";\n");
                }
                _ => {
                    let decl = self.declarator(&ty, &record.name)?;
                    self.out.push(&decl);
                    if let Some(init) = init {
                        self.out.push(" = ");
                        self.expr(init)?;
                    }
                    self.out.push(";\n");
                }
            }
        }
        Ok(())
    }

    fn signature(&mut self, function: crate::ast::FunctionId) -> Result<String> {
        let f = self.ctx.functions.get(function);
        let mut s = format!("{} {}(", self.type_name(&f.return_type)?, f.name);

        for (i, param) in f.parameters.iter().enumerate() {
            if i > 0 {
                s.push_str(", ");
            }
            let record = self.ctx.variables.get(param.var);
            match param.direction {
                ParamDirection::In => {
                    s.push_str(&self.declarator(&record.ty, &record.name)?);
                }
                ParamDirection::Const => {
                    s.push_str("const ");
                    s.push_str(&self.declarator(&record.ty, &record.name)?);
                }
                ParamDirection::Out | ParamDirection::InOut => {
                    s.push_str(&format!(
                        "thread {}& {}",
                        self.type_name(&record.ty)?,
                        record.name
                    ));
                }
            }
        }

        s.push(')');
        Ok(s)
    }

    fn function_definition(&mut self, stmt: &Node) -> Result<()> {
        let (function, body) = match &stmt.kind {
            NodeKind::FunctionDefinition { function, body } => (*function, body),
            _ => unreachable!(),
        };

        let sig = self.signature(function)?;
        self.out.push(&sig);
        self.out.push("\n");
        self.block(body)?;
        self.out.push("\n");
        Ok(())
    }

    fn block(&mut self, node: &Node) -> Result<()> {
        let statements = match &node.kind {
            NodeKind::Block { statements } => statements,
            _ => return Err(Error::Internal("expected a block".to_owned())),
        };

        self.line_start();
        self.out.push("{\n");
        self.indent += 1;
        for stmt in statements {
            self.statement(stmt)?;
        }
        self.indent -= 1;
        self.line_start();
        self.out.push("}\n");
        Ok(())
    }

    fn statement(&mut self, node: &Node) -> Result<()> {
        match &node.kind {
            NodeKind::Declaration { declarators } => {
                for declarator in declarators {
                    let (var, init) = split_declarator(declarator)?;
                    let record = self.ctx.variables.get(var);
                    self.line_start();
                    let decl = self.declarator(&record.ty, &record.name)?;
                    self.out.push(&decl);
                    if let Some(init) = init {
                        self.out.push(" = ");
                        self.expr(init)?;
                    }
                    self.out.push(";\n");
                }
            }
            NodeKind::Block { .. } => self.block(node)?,
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.line_start();
                self.out.push("if (");
                self.expr(condition)?;
                self.out.push(")\n");
                self.block(then_block)?;
                if let Some(else_block) = else_block {
                    self.line_start();
                    self.out.push("else\n");
                    self.block(else_block)?;
                }
            }
            NodeKind::Loop { .. } => self.loop_statement(node)?,
            NodeKind::Branch { kind, operand } => {
                self.line_start();
                match kind {
                    crate::ast::BranchKind::Return => {
                        self.out.push("return");
                        if let Some(operand) = operand {
                            self.out.push(" ");
                            self.expr(operand)?;
                        }
                    }
                    crate::ast::BranchKind::Break => self.out.push("break"),
                    crate::ast::BranchKind::Continue => self.out.push("continue"),
                    crate::ast::BranchKind::Discard => self.out.push("discard_fragment()"),
                }
                self.out.push(";\n");
            }
            _ => {
                self.line_start();
                self.expr(node)?;
                self.out.push(";\n");
            }
        }
        Ok(())
    }

    fn loop_statement(&mut self, node: &Node) -> Result<()> {
        let (kind, init, condition, increment, body) = match &node.kind {
            NodeKind::Loop {
                kind,
                init,
                condition,
                increment,
                body,
            } => (*kind, init, condition, increment, body),
            _ => unreachable!(),
        };

        match kind {
            crate::ast::LoopKind::For => {
                self.line_start();
                self.out.push("for (");
                if let Some(init) = init {
                    self.inline_declaration(init)?;
                }
                self.out.push("; ");
                if let Some(condition) = condition {
                    self.expr(condition)?;
                }
                self.out.push("; ");
                if let Some(increment) = increment {
                    self.expr(increment)?;
                }
                self.out.push(")\n");
                self.block(body)?;
            }
            crate::ast::LoopKind::While => {
                self.line_start();
                self.out.push("while (");
                match condition {
                    Some(condition) => self.expr(condition)?,
                    None => self.out.push("true"),
                }
                self.out.push(")\n");
                self.block(body)?;
            }
            crate::ast::LoopKind::DoWhile => {
                self.line_start();
                self.out.push("do\n");
                self.block(body)?;
                self.line_start();
                self.out.push("while (");
                match condition {
                    Some(condition) => self.expr(condition)?,
                    None => self.out.push("true"),
                }
                self.out.push(");\n");
            }
        }
        Ok(())
    }

    fn inline_declaration(&mut self, node: &Node) -> Result<()> {
        match &node.kind {
            NodeKind::Declaration { declarators } if declarators.len() == 1 => {
                let (var, init) = split_declarator(&declarators[0])?;
                let record = self.ctx.variables.get(var);
                let decl = self.declarator(&record.ty, &record.name)?;
                self.out.push(&decl);
                if let Some(init) = init {
                    self.out.push(" = ");
                    self.expr(init)?;
                }
                Ok(())
            }
            NodeKind::Declaration { .. } => {
                Err(self.unsupported("multi-declarator loop initializer"))
            }
            _ => self.expr(node),
        }
    }

    fn expr(&mut self, node: &Node) -> Result<()> {
        match &node.kind {
            NodeKind::Symbol(var) => {
                let name = self.ctx.variables.get(*var).name.clone();
                self.out.push(&name);
            }
            NodeKind::Constant(value) => self.constant(&node.ty, value)?,
            NodeKind::Unary { op, operand } => {
                let (token, postfix) = unary_token(*op);
                self.out.push("(");
                if !postfix {
                    self.out.push(token);
                }
                self.expr(operand)?;
                if postfix {
                    self.out.push(token);
                }
                self.out.push(")");
            }
            NodeKind::Binary { op, left, right } => self.binary(*op, left, right)?,
            NodeKind::Swizzle {
                operand,
                components,
            } => {
                self.expr(operand)?;
                self.out.push(".");
                let name = crate::ast::swizzle_name(components);
                self.out.push(&name);
            }
            NodeKind::Ternary {
                condition,
                true_expr,
                false_expr,
            } => {
                self.out.push("(");
                self.expr(condition)?;
                self.out.push(" ? ");
                self.expr(true_expr)?;
                self.out.push(" : ");
                self.expr(false_expr)?;
                self.out.push(")");
            }
            NodeKind::Call { target, args } => self.call(node, target, args)?,
            _ => return Err(Error::Internal("statement in expression position".to_owned())),
        }
        Ok(())
    }

    fn constant(&mut self, ty: &Type, value: &ConstantValue) -> Result<()> {
        if value.0.len() == 1 {
            self.scalar(&value.0[0]);
        } else {
            let name = self.type_name(ty)?;
            self.out.push(&name);
            self.out.push("(");
            for (i, scalar) in value.0.iter().enumerate() {
                if i > 0 {
                    self.out.push(", ");
                }
                self.scalar(scalar);
            }
            self.out.push(")");
        }
        Ok(())
    }

    fn scalar(&mut self, scalar: &Scalar) {
        match scalar {
            Scalar::Float(v) => self.out.push(&format_float(*v)),
            Scalar::Int(v) => self.out.push(&v.to_string()),
            Scalar::UInt(v) => self.out.push(&format!("{}u", v)),
            Scalar::Bool(v) => self.out.push(if *v { "true" } else { "false" }),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: &Node, right: &Node) -> Result<()> {
        match op {
            BinaryOp::Index => {
                self.expr(left)?;
                self.out.push("[");
                self.expr(right)?;
                self.out.push("]");
                return Ok(());
            }
            BinaryOp::IndexStruct => return self.struct_field(left, right),
            BinaryOp::Comma => {
                self.out.push("(");
                self.expr(left)?;
                self.out.push(", ");
                self.expr(right)?;
                self.out.push(")");
                return Ok(());
            }
            _ => {}
        }

        let token = match binary_token(op) {
            Mapping::Infix(token) => token,
            _ => {
                return Err(Error::UnimplementedOperator {
                    target: Target::Msl,
                    operator: format!("{:?}", op),
                })
            }
        };

        let statement_level = matches!(
            op,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::Initialize
        );
        if !statement_level {
            self.out.push("(");
        }
        self.expr(left)?;
        self.out.push(" ");
        self.out.push(token);
        self.out.push(" ");
        self.expr(right)?;
        if !statement_level {
            self.out.push(")");
        }
        Ok(())
    }

    fn struct_field(&mut self, base: &Node, index: &Node) -> Result<()> {
        let (id, field) = field_access(base, index)
            .ok_or_else(|| Error::Internal("malformed field access".to_owned()))?;
        let def = self.ctx.structs.get(id);
        let name = def
            .fields
            .get(field)
            .ok_or_else(|| Error::Internal("field index out of range".to_owned()))?
            .name
            .clone();

        self.expr(base)?;
        self.out.push(".");
        self.out.push(&name);
        Ok(())
    }

    fn call(&mut self, node: &Node, target: &CallTarget, args: &[Node]) -> Result<()> {
        match target {
            CallTarget::Function(function) => {
                let name = self.ctx.functions.get(*function).name.clone();
                self.out.push(&name);
                self.arg_list(args)?;
            }
            CallTarget::Constructor => {
                let name = self.type_name(&node.ty)?;
                self.out.push(&name);
                self.arg_list(args)?;
            }
            CallTarget::Builtin(op) => self.builtin(*op, args)?,
        }
        Ok(())
    }

    fn arg_list(&mut self, args: &[Node]) -> Result<()> {
        self.out.push("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push(", ");
            }
            self.expr(arg)?;
        }
        self.out.push(")");
        Ok(())
    }

    fn builtin(&mut self, op: BuiltinOp, args: &[Node]) -> Result<()> {
        if op.is_texture() {
            return self.texture(op, args);
        }

        let width = args.first().map(|a| a.ty.component_count()).unwrap_or(1);
        if let Some(emulated) = self.emulation.record_call(op, width) {
            self.out.push(emulated);
            return self.arg_list(args);
        }

        let mapping = match op {
            BuiltinOp::Atan if args.len() == 2 => Mapping::Call("atan2"),
            BuiltinOp::InverseSqrt => Mapping::Call("rsqrt"),
            BuiltinOp::FaceForward => Mapping::Call("faceforward"),
            BuiltinOp::DFdx => Mapping::Call("dfdx"),
            BuiltinOp::DFdy => Mapping::Call("dfdy"),
            BuiltinOp::FloatBitsToInt => Mapping::Call("as_type<int>"),
            BuiltinOp::IntBitsToFloat => Mapping::Call("as_type<float>"),
            BuiltinOp::SmoothStep => Mapping::Call("smoothstep"),
            BuiltinOp::Not => Mapping::Prefix("!"),
            BuiltinOp::MatrixCompMult | BuiltinOp::Inverse => Mapping::Unsupported,
            _ => Mapping::Call(op.glsl_name()),
        };

        match mapping {
            Mapping::Call(name) => {
                self.out.push(name);
                self.arg_list(args)
            }
            Mapping::Infix(token) => {
                self.out.push("(");
                self.expr(&args[0])?;
                self.out.push(&format!(" {} ", token));
                self.expr(&args[1])?;
                self.out.push(")");
                Ok(())
            }
            Mapping::Prefix(token) => {
                self.out.push("(");
                self.out.push(token);
                self.expr(&args[0])?;
                self.out.push(")");
                Ok(())
            }
            Mapping::Unsupported => Err(Error::UnimplementedOperator {
                target: Target::Msl,
                operator: op.glsl_name().to_owned(),
            }),
        }
    }

    /// Texture builtins; lod/bias/gradients are wrapped in their MSL option
    /// types, constant offsets come last
    fn texture(&mut self, op: BuiltinOp, args: &[Node]) -> Result<()> {
        let sampler = args
            .first()
            .ok_or_else(|| Error::Internal("texture call without sampler".to_owned()))?;
        let name = match &sampler.kind {
            NodeKind::Symbol(var) => self.ctx.variables.get(*var).name.clone(),
            _ => return Err(self.unsupported("computed sampler expression")),
        };

        let rest = &args[1..];
        match op {
            BuiltinOp::Texture => {
                self.out.push(&format!("{}.sample({}_sampler, ", name, name));
                self.expr(&rest[0])?;
                if rest.len() == 2 {
                    self.out.push(", bias(");
                    self.expr(&rest[1])?;
                    self.out.push(")");
                }
            }
            BuiltinOp::TextureLod => {
                self.out.push(&format!("{}.sample({}_sampler, ", name, name));
                self.expr(&rest[0])?;
                self.out.push(", level(");
                self.expr(&rest[1])?;
                self.out.push(")");
            }
            BuiltinOp::TextureGrad => {
                self.out.push(&format!("{}.sample({}_sampler, ", name, name));
                self.expr(&rest[0])?;
                self.out.push(", gradient2d(");
                self.expr(&rest[1])?;
                self.out.push(", ");
                self.expr(&rest[2])?;
                self.out.push(")");
            }
            BuiltinOp::TextureOffset => {
                self.out.push(&format!("{}.sample({}_sampler, ", name, name));
                self.expr(&rest[0])?;
                self.out.push(", ");
                self.expr(&rest[1])?;
            }
            BuiltinOp::TexelFetch => {
                self.out.push(&format!("{}.read(uint2(", name));
                self.expr(&rest[0])?;
                self.out.push("), ");
                self.expr(&rest[1])?;
            }
            _ => unreachable!(),
        }
        self.out.push(")");
        Ok(())
    }
}

fn split_declarator(declarator: &Node) -> Result<(VariableId, Option<&Node>)> {
    match &declarator.kind {
        NodeKind::Symbol(var) => Ok((*var, None)),
        NodeKind::Binary {
            op: BinaryOp::Initialize,
            left,
            right,
        } => match &left.kind {
            NodeKind::Symbol(var) => Ok((*var, Some(right))),
            _ => Err(Error::MalformedDeclaration(declarator.id)),
        },
        _ => Err(Error::MalformedDeclaration(declarator.id)),
    }
}

fn unary_token(op: UnaryOp) -> (&'static str, bool) {
    match op {
        UnaryOp::Negate => ("-", false),
        UnaryOp::LogicalNot => ("!", false),
        UnaryOp::BitwiseNot => ("~", false),
        UnaryOp::PreIncrement => ("++", false),
        UnaryOp::PreDecrement => ("--", false),
        UnaryOp::PostIncrement => ("++", true),
        UnaryOp::PostDecrement => ("--", true),
    }
}

fn binary_token(op: BinaryOp) -> Mapping {
    match op {
        BinaryOp::Add => Mapping::Infix("+"),
        BinaryOp::Sub => Mapping::Infix("-"),
        BinaryOp::Mul => Mapping::Infix("*"),
        BinaryOp::Div => Mapping::Infix("/"),
        BinaryOp::Rem => Mapping::Infix("%"),
        BinaryOp::ShiftLeft => Mapping::Infix("<<"),
        BinaryOp::ShiftRight => Mapping::Infix(">>"),
        BinaryOp::BitAnd => Mapping::Infix("&"),
        BinaryOp::BitXor => Mapping::Infix("^"),
        BinaryOp::BitOr => Mapping::Infix("|"),
        BinaryOp::LessThan => Mapping::Infix("<"),
        BinaryOp::GreaterThan => Mapping::Infix(">"),
        BinaryOp::LessThanEqual => Mapping::Infix("<="),
        BinaryOp::GreaterThanEqual => Mapping::Infix(">="),
        BinaryOp::Equal => Mapping::Infix("=="),
        BinaryOp::NotEqual => Mapping::Infix("!="),
        BinaryOp::LogicalAnd => Mapping::Infix("&&"),
        BinaryOp::LogicalOr => Mapping::Infix("||"),
        BinaryOp::LogicalXor => Mapping::Infix("!="),
        BinaryOp::Assign | BinaryOp::Initialize => Mapping::Infix("="),
        BinaryOp::AddAssign => Mapping::Infix("+="),
        BinaryOp::SubAssign => Mapping::Infix("-="),
        BinaryOp::MulAssign => Mapping::Infix("*="),
        BinaryOp::DivAssign => Mapping::Infix("/="),
        BinaryOp::Comma | BinaryOp::Index | BinaryOp::IndexStruct => Mapping::Unsupported,
    }
}
