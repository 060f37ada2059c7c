//! Per-target output backends.
//!
//! One recursive-descent emitter per target language, all reading the same
//! transformed tree. Emitters never rewrite the tree; a construct the target
//! cannot express at this point is a pipeline bug and is diagnosed as
//! [Error::UnsupportedConstruct](crate::error::Error::UnsupportedConstruct)
//! rather than papered over.
//!
//! Expressions are emitted fully parenthesized. Readability of the output is
//! not a goal; round-trip fidelity is.

mod hlsl;
mod msl;
mod struct_order;
mod wgsl;

pub use struct_order::{ordered_structs, StructOrder};

use crate::ast::{ConstantValue, Node, NodeKind, Scalar, StructId, Type};
use crate::context::Context;
use crate::error::Result;

/// Output language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Hlsl,
    Msl,
    Wgsl,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Target::Hlsl => "HLSL",
            Target::Msl => "MSL",
            Target::Wgsl => "WGSL",
        })
    }
}

/// How a target spells one source operator
#[derive(Debug, Clone, Copy)]
pub enum Mapping {
    /// Binary infix token
    Infix(&'static str),
    /// Unary prefix token
    Prefix(&'static str),
    /// Plain function call
    Call(&'static str),
    /// No spelling; the pipeline should have rewritten this away
    Unsupported,
}

/// Emit the transformed tree in the requested target language
pub fn emit(root: &Node, ctx: &Context, target: Target) -> Result<String> {
    match target {
        Target::Hlsl => hlsl::emit(root, ctx),
        Target::Msl => msl::emit(root, ctx),
        Target::Wgsl => wgsl::emit(root, ctx),
    }
}

const INDENT_WIDTH: usize = 4;

/// Shortest float spelling that still reads back as the same value and
/// always contains a decimal point or exponent
pub(crate) fn format_float(value: f32) -> String {
    let s = format!("{:?}", value);
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{}.0", s)
    }
}

/// Resolve an `IndexStruct` access to its struct id and field index
pub(crate) fn field_access(base: &Node, index: &Node) -> Option<(StructId, usize)> {
    let structure = base.ty.struct_id?;
    match &index.kind {
        NodeKind::Constant(ConstantValue(values)) => match values.as_slice() {
            [Scalar::Int(i)] if *i >= 0 => Some((structure, *i as usize)),
            _ => None,
        },
        _ => None,
    }
}

/// Struct ids referenced by declarations and signatures anywhere in the tree,
/// in first-reference order. Interface blocks are emitted by their own paths
/// and excluded.
pub(crate) fn referenced_structs(root: &Node, ctx: &Context) -> Vec<StructId> {
    let mut wanted = Vec::new();

    fn note(ty: &Type, wanted: &mut Vec<StructId>) {
        if ty.basic == crate::ast::BasicType::Struct {
            if let Some(id) = ty.struct_id {
                if !wanted.contains(&id) {
                    wanted.push(id);
                }
            }
        }
    }

    fn walk(node: &Node, ctx: &Context, wanted: &mut Vec<StructId>) {
        note(&node.ty, wanted);
        if let NodeKind::FunctionDefinition { function, .. } = &node.kind {
            let f = ctx.functions.get(*function);
            note(&f.return_type, wanted);
            for p in &f.parameters {
                note(&ctx.variables.get(p.var).ty, wanted);
            }
        }
        for child in node.children() {
            walk(child, ctx, wanted);
        }
    }

    walk(root, ctx, &mut wanted);
    wanted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_a_decimal_point() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(-2.0), "-2.0");
    }
}
