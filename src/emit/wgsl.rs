//! WGSL output backend.
//!
//! The pipeline removes everything WGSL cannot express before emission:
//! ternaries and comma expressions are extracted, multi-component swizzle
//! stores split, written value parameters materialized. Whatever still
//! reaches this backend unexpressed is diagnosed, never guessed.
//!
//! Output parameters become `ptr<function, T>`: uses inside the callee
//! dereference, arguments at the call site take the address of the local the
//! out-parameter pass routed them through.
//!
//! Uniform address space arrays have a 16-byte element stride. Array fields
//! whose natural element stride is smaller are wrapped in a synthesized
//! one-field struct with `@size(16)`; indexed accesses append the wrapper
//! field and whole-array reads go through a generated unwrap function.

use std::collections::HashMap;

use crate::ast::{
    ArraySize, BasicType, BinaryOp, BuiltinOp, CallTarget, ConstantValue, Node, NodeKind,
    ParamDirection, Qualifier, SamplerKind, Scalar, StructId, Type, UnaryOp, VariableId,
};
use crate::builtins::EmulationRegistry;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::sink::Sink;

use super::{
    field_access, format_float, ordered_structs, referenced_structs, Mapping, Target, INDENT_WIDTH,
};

/// Field of a uniform struct whose array elements were wrapped for stride
struct Wrapped {
    wrapper: String,
    unwrap: String,
    length: u32,
}

struct Emitter<'c> {
    ctx: &'c Context,
    out: Sink,
    indent: usize,
    emulation: EmulationRegistry,
    wrapped: HashMap<(StructId, usize), Wrapped>,
    next_binding: u32,
}

pub fn emit(root: &Node, ctx: &Context) -> Result<String> {
    let mut emitter = Emitter {
        ctx,
        out: Sink::new(),
        indent: 0,
        emulation: EmulationRegistry::new(Target::Wgsl),
        wrapped: HashMap::new(),
        next_binding: 0,
    };

    let mut prelude = Sink::new();
    emitter.plan_uniform_wrapping(root, &mut prelude)?;
    emitter.translation_unit(root)?;

    let mut full = Sink::new();
    full.push_sink(&prelude);

    let wanted = referenced_structs(root, ctx);
    if !wanted.is_empty() {
        let mut structs = Sink::new();
        for id in ordered_structs(ctx, &wanted) {
            emitter.struct_declaration_into(&mut structs, id)?;
        }
        full.push_sink(&structs);
    }

    if emitter.emulation.any_used() {
        emitter.emulation.emit_definitions(&mut full);
        full.push("\n");
    }

    full.push_sink(&emitter.out);
    Ok(full.into_string())
}

/// Natural element stride in bytes, for stride-wrapping decisions. Only
/// scalars and vectors can fall under 16.
fn natural_stride(ty: &Type) -> u32 {
    if ty.is_scalar() {
        4
    } else if ty.is_vector() {
        u32::from(ty.primary_size) * 4
    } else {
        16
    }
}

impl<'c> Emitter<'c> {
    fn unsupported(&self, construct: &str) -> Error {
        Error::UnsupportedConstruct {
            target: Target::Wgsl,
            construct: construct.to_owned(),
        }
    }

    fn line_start(&mut self) {
        self.out.push_repeated(' ', self.indent * INDENT_WIDTH);
    }

    /// Find uniform-reachable struct fields needing stride wrappers; emit the
    /// wrapper structs and unwrap functions into `prelude`
    fn plan_uniform_wrapping(&mut self, root: &Node, prelude: &mut Sink) -> Result<()> {
        let statements = match &root.kind {
            NodeKind::Block { statements } => statements,
            _ => return Ok(()),
        };

        // Structs transitively reachable from uniform globals.
        let mut reachable: Vec<StructId> = Vec::new();
        let mut queue: Vec<StructId> = Vec::new();
        for stmt in statements {
            if let NodeKind::Declaration { declarators } = &stmt.kind {
                for declarator in declarators {
                    if let Ok((var, _)) = split_declarator(declarator) {
                        let ty = &self.ctx.variables.get(var).ty;
                        if ty.qualifier == Qualifier::Uniform {
                            if let Some(id) = ty.struct_id {
                                queue.push(id);
                            }
                        }
                    }
                }
            }
        }
        while let Some(id) = queue.pop() {
            if reachable.contains(&id) {
                continue;
            }
            reachable.push(id);
            for field in &self.ctx.structs.get(id).fields {
                if let Some(embedded) = field.ty.struct_id {
                    queue.push(embedded);
                }
            }
        }

        let mut counter = 0u32;
        for id in reachable {
            for (index, field) in self.ctx.structs.get(id).fields.iter().enumerate() {
                let length = match field.ty.array_sizes.as_slice() {
                    [ArraySize::Fixed(n)] => *n,
                    _ => continue,
                };
                let mut element = field.ty.clone();
                element.array_sizes.clear();
                if natural_stride(&element) >= 16 {
                    continue;
                }

                let wrapper = format!("{}_stride{}", crate::PREFIX, counter);
                let unwrap = format!("{}_unwrap{}", crate::PREFIX, counter);
                counter += 1;

                let element_name = self.type_name(&element)?;
                prelude.push(&format!(
                    "struct {}\n{{\n    @size(16) e : {},\n}};\n\n",
                    wrapper, element_name
                ));
                prelude.push(&format!(
                    "fn {}(w : array<{}, {}>) -> array<{}, {}>\n{{\n    var r : array<{}, {}>;\n    for (var i : i32 = 0; i < {}; i++)\n    {{\n        r[i] = w[i].e;\n    }}\n    return r;\n}}\n\n",
                    unwrap, wrapper, length, element_name, length, element_name, length, length
                ));

                self.wrapped.insert(
                    (id, index),
                    Wrapped {
                        wrapper,
                        unwrap,
                        length,
                    },
                );
            }
        }
        Ok(())
    }

    fn type_name(&self, ty: &Type) -> Result<String> {
        let mut base = match ty.basic {
            BasicType::Void => return Err(Error::Internal("void value type".to_owned())),
            BasicType::Float => {
                if ty.is_matrix() {
                    format!("mat{}x{}<f32>", ty.secondary_size, ty.primary_size)
                } else if ty.is_vector() {
                    format!("vec{}<f32>", ty.primary_size)
                } else {
                    "f32".to_owned()
                }
            }
            BasicType::Int => {
                if ty.is_vector() {
                    format!("vec{}<i32>", ty.primary_size)
                } else {
                    "i32".to_owned()
                }
            }
            BasicType::UInt => {
                if ty.is_vector() {
                    format!("vec{}<u32>", ty.primary_size)
                } else {
                    "u32".to_owned()
                }
            }
            BasicType::Bool => {
                if ty.is_vector() {
                    format!("vec{}<bool>", ty.primary_size)
                } else {
                    "bool".to_owned()
                }
            }
            BasicType::Sampler(kind) => match kind {
                SamplerKind::Sampler2D => "texture_2d<f32>".to_owned(),
                SamplerKind::Sampler3D => "texture_3d<f32>".to_owned(),
                SamplerKind::SamplerCube => "texture_cube<f32>".to_owned(),
                SamplerKind::Sampler2DArray => "texture_2d_array<f32>".to_owned(),
                SamplerKind::Sampler2DShadow => "texture_depth_2d".to_owned(),
            },
            BasicType::Struct | BasicType::InterfaceBlock => {
                let id = ty
                    .struct_id
                    .ok_or_else(|| Error::Internal("struct type without field list".to_owned()))?;
                self.ctx.structs.get(id).name.clone()
            }
        };

        // Innermost dimension first.
        for size in ty.array_sizes.iter().rev() {
            base = match size {
                ArraySize::Fixed(n) => format!("array<{}, {}>", base, n),
                ArraySize::Unsized => format!("array<{}>", base),
            };
        }
        Ok(base)
    }

    fn struct_declaration_into(&mut self, sink: &mut Sink, id: StructId) -> Result<()> {
        let def = self.ctx.structs.get(id);
        sink.push(&format!("struct {}\n{{\n", def.name));
        for (index, field) in def.fields.iter().enumerate() {
            let name = match self.wrapped.get(&(id, index)) {
                Some(w) => format!("array<{}, {}>", w.wrapper, w.length),
                None => self.type_name(&field.ty)?,
            };
            sink.push(&format!("    {} : {},\n", field.name, name));
        }
        sink.push("};\n\n");
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
                // WGSL has no forward declarations and needs none.
                NodeKind::FunctionPrototype { .. } => {}
                _ => return Err(Error::Internal("statement at file scope".to_owned())),
            }
        }
        Ok(())
    }

    fn binding(&mut self) -> u32 {
        let b = self.next_binding;
        self.next_binding += 1;
        b
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
                    let mut block = Sink::new();
                    self.struct_declaration_into(&mut block, id)?;
                    self.out.push_sink(&block);
                    let name = self.ctx.structs.get(id).name.clone();
                    let binding = self.binding();
                    self.out.push(&format!(
                        "@group(0) @binding({}) var<uniform> {} : {};\n",
                        binding, record.name, name
                    ));
                }
                (Qualifier::Uniform, BasicType::Sampler(_)) => {
                    let texture = self.type_name(&ty)?;
                    let binding = self.binding();
                    self.out.push(&format!(
                        "@group(0) @binding({}) var {} : {};\n",
                        binding, record.name, texture
                    ));
                    let binding = self.binding();
                    self.out.push(&format!(
                        "@group(0) @binding({}) var {}_sampler : sampler;\n",
                        binding, record.name
                    ));
                }
                (Qualifier::Const, _) => {
                    let name = self.type_name(&ty)?;
                    self.out
                        .push(&format!("const {} : {}", record.name, name));
                    if let Some(init) = init {
                        self.out.push(" = ");
                        self.expr(init)?;
                    }
                    self.out.push(";\n");
                }
                _ => {
                    let name = self.type_name(&ty)?;
                    self.out
                        .push(&format!("var<private> {} : {}", record.name, name));
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
        let mut s = format!("fn {}(", f.name);

        for (i, param) in f.parameters.iter().enumerate() {
            if i > 0 {
                s.push_str(", ");
            }
            let record = self.ctx.variables.get(param.var);
            match param.direction {
                ParamDirection::In | ParamDirection::Const => {
                    s.push_str(&format!(
                        "{} : {}",
                        record.name,
                        self.type_name(&record.ty)?
                    ));
                }
                ParamDirection::Out | ParamDirection::InOut => {
                    s.push_str(&format!(
                        "{} : ptr<function, {}>",
                        record.name,
                        self.type_name(&record.ty)?
                    ));
                }
            }
        }

        s.push(')');
        if f.return_type.basic != BasicType::Void {
            s.push_str(&format!(" -> {}", self.type_name(&f.return_type)?));
        }
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
                    self.line_start();
                    self.local_declaration(declarator)?;
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
                    crate::ast::BranchKind::Discard => self.out.push("discard"),
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

    /// `var name : T = init`, without indentation or terminator
    fn local_declaration(&mut self, declarator: &Node) -> Result<()> {
        let (var, init) = split_declarator(declarator)?;
        let record = self.ctx.variables.get(var);
        let name = self.type_name(&record.ty)?;
        self.out
            .push(&format!("var {} : {}", record.name, name));
        if let Some(init) = init {
            self.out.push(" = ");
            self.expr(init)?;
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
                    match &init.kind {
                        NodeKind::Declaration { declarators } if declarators.len() == 1 => {
                            self.local_declaration(&declarators[0])?;
                        }
                        NodeKind::Declaration { .. } => {
                            return Err(self.unsupported("multi-declarator loop initializer"))
                        }
                        _ => self.expr(init)?,
                    }
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
                // loop { body; continuing { break if !(cond); } }
                self.line_start();
                self.out.push("loop\n");
                self.line_start();
                self.out.push("{\n");
                self.indent += 1;

                let statements = match &body.kind {
                    NodeKind::Block { statements } => statements,
                    _ => return Err(Error::Internal("loop body is not a block".to_owned())),
                };
                for stmt in statements {
                    self.statement(stmt)?;
                }

                self.line_start();
                self.out.push("continuing\n");
                self.line_start();
                self.out.push("{\n");
                self.indent += 1;
                self.line_start();
                self.out.push("break if !(");
                match condition {
                    Some(condition) => self.expr(condition)?,
                    None => self.out.push("true"),
                }
                self.out.push(");\n");
                self.indent -= 1;
                self.line_start();
                self.out.push("}\n");

                self.indent -= 1;
                self.line_start();
                self.out.push("}\n");
            }
        }
        Ok(())
    }

    fn expr(&mut self, node: &Node) -> Result<()> {
        match &node.kind {
            NodeKind::Symbol(var) => {
                let record = self.ctx.variables.get(*var);
                // Pointer-typed parameters dereference at every use.
                if record.ty.qualifier.is_writable_param() {
                    self.out.push(&format!("(*{})", record.name));
                } else {
                    let name = record.name.clone();
                    self.out.push(&name);
                }
            }
            NodeKind::Constant(value) => self.constant(&node.ty, value)?,
            NodeKind::Unary { op, operand } => self.unary(*op, operand)?,
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
            NodeKind::Ternary { .. } => return Err(self.unsupported("ternary expression")),
            NodeKind::Call { target, args } => self.call(node, target, args)?,
            _ => return Err(Error::Internal("statement in expression position".to_owned())),
        }
        Ok(())
    }

    fn unary(&mut self, op: UnaryOp, operand: &Node) -> Result<()> {
        match op {
            UnaryOp::Negate => {
                self.out.push("(-");
                self.expr(operand)?;
                self.out.push(")");
            }
            UnaryOp::LogicalNot => {
                self.out.push("(!");
                self.expr(operand)?;
                self.out.push(")");
            }
            UnaryOp::BitwiseNot => {
                self.out.push("(~");
                self.expr(operand)?;
                self.out.push(")");
            }
            // WGSL increment/decrement are statements; both source flavors
            // land in statement position by this point.
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => {
                self.expr(operand)?;
                self.out.push("++");
            }
            UnaryOp::PreDecrement | UnaryOp::PostDecrement => {
                self.expr(operand)?;
                self.out.push("--");
            }
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

    /// The wrap info if `node` is a field access selecting a stride-wrapped
    /// array field
    fn wrapped_field(&self, node: &Node) -> Option<&Wrapped> {
        if let NodeKind::Binary {
            op: BinaryOp::IndexStruct,
            left,
            right,
        } = &node.kind
        {
            let (id, field) = field_access(left, right)?;
            return self.wrapped.get(&(id, field));
        }
        None
    }

    fn binary(&mut self, op: BinaryOp, left: &Node, right: &Node) -> Result<()> {
        match op {
            BinaryOp::Index => {
                // Indexing into a stride-wrapped array selects the wrapper
                // element.
                let wrapped = self.wrapped_field(left).is_some();
                self.expr(left)?;
                self.out.push("[");
                self.expr(right)?;
                self.out.push("]");
                if wrapped {
                    self.out.push(".e");
                }
                return Ok(());
            }
            BinaryOp::IndexStruct => return self.struct_field(left, right),
            BinaryOp::Comma => return Err(self.unsupported("comma expression")),
            _ => {}
        }

        let token = match binary_token(op) {
            Mapping::Infix(token) => token,
            _ => {
                return Err(Error::UnimplementedOperator {
                    target: Target::Wgsl,
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

        // A whole-array read of a wrapped field goes through its unwrap
        // function; indexed reads are handled by the Index case instead.
        if let Some(w) = self.wrapped.get(&(id, field)) {
            let unwrap = w.unwrap.clone();
            self.out.push(&format!("{}(", unwrap));
            self.expr(base)?;
            self.out.push(&format!(".{})", name));
            return Ok(());
        }

        self.expr(base)?;
        self.out.push(".");
        self.out.push(&name);
        Ok(())
    }

    fn call(&mut self, node: &Node, target: &CallTarget, args: &[Node]) -> Result<()> {
        match target {
            CallTarget::Function(function) => {
                let f = self.ctx.functions.get(*function);
                let name = f.name.clone();
                let directions: Vec<ParamDirection> =
                    f.parameters.iter().map(|p| p.direction).collect();

                self.out.push(&name);
                self.out.push("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push(", ");
                    }
                    let is_output = directions.get(i).map(|d| d.is_output()).unwrap_or(false);
                    if is_output {
                        self.out_argument(arg)?;
                    } else {
                        self.expr(arg)?;
                    }
                }
                self.out.push(")");
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

    /// Address of the l-value bound to an out/inout parameter. After the
    /// out-parameter pass these are plain symbols; a symbol that is itself a
    /// pointer parameter forwards directly.
    fn out_argument(&mut self, arg: &Node) -> Result<()> {
        match &arg.kind {
            NodeKind::Symbol(var) => {
                let record = self.ctx.variables.get(*var);
                if record.ty.qualifier.is_writable_param() {
                    let name = record.name.clone();
                    self.out.push(&name);
                } else {
                    self.out.push(&format!("&{}", record.name));
                }
                Ok(())
            }
            _ => Err(self.unsupported("compound out-parameter argument")),
        }
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
            BuiltinOp::InverseSqrt => Mapping::Call("inverseSqrt"),
            BuiltinOp::FaceForward => Mapping::Call("faceForward"),
            BuiltinOp::SmoothStep => Mapping::Call("smoothstep"),
            BuiltinOp::DFdx => Mapping::Call("dpdx"),
            BuiltinOp::DFdy => Mapping::Call("dpdy"),
            BuiltinOp::FloatBitsToInt => Mapping::Call("bitcast<i32>"),
            BuiltinOp::IntBitsToFloat => Mapping::Call("bitcast<f32>"),
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
                target: Target::Wgsl,
                operator: op.glsl_name().to_owned(),
            }),
        }
    }

    /// Texture builtins as the `textureSample*` family; texture first, then
    /// sampler, coordinates, lod/gradients, constant offset last
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
                self.out
                    .push(&format!("textureSample({}, {}_sampler, ", name, name));
                self.expr(&rest[0])?;
            }
            BuiltinOp::TextureLod => {
                self.out
                    .push(&format!("textureSampleLevel({}, {}_sampler, ", name, name));
                self.expr(&rest[0])?;
                self.out.push(", ");
                self.expr(&rest[1])?;
            }
            BuiltinOp::TextureGrad => {
                self.out
                    .push(&format!("textureSampleGrad({}, {}_sampler, ", name, name));
                self.expr(&rest[0])?;
                self.out.push(", ");
                self.expr(&rest[1])?;
                self.out.push(", ");
                self.expr(&rest[2])?;
            }
            BuiltinOp::TextureOffset => {
                self.out
                    .push(&format!("textureSample({}, {}_sampler, ", name, name));
                self.expr(&rest[0])?;
                self.out.push(", ");
                self.expr(&rest[1])?;
            }
            BuiltinOp::TexelFetch => {
                self.out.push(&format!("textureLoad({}, vec2<i32>(", name));
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
