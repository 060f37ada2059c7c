//! End-to-end translation pipeline.
//!
//! [translate] runs the rewrite passes in a fixed order over a resolved tree,
//! validates the result and hands it to the backend for the requested target.
//! Which rewrites run is decided here, per target; the passes themselves are
//! target-agnostic.

use derive_builder::Builder;
use log::{debug, info};

use crate::ast::{BranchKind, BuiltinOp, CallTarget, Node, NodeKind};
use crate::context::Context;
use crate::emit::{self, Target};
use crate::error::{Error, Result};
use crate::passes::{
    broadcast_scalars, chunk_loops, extract_expressions, gather_uniforms, materialize_params,
    prune_no_ops, rewrite_out_parameters, separate_declarations, split_swizzles, BroadcastRules,
    ExtractKinds,
};
use crate::symbol::SymbolTable;
use crate::traverse::{validate, ValidateOptions};

/// Pipeline stage the shader runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

/// Translation settings
#[derive(Debug, Clone, Builder)]
pub struct CompileOptions {
    /// Output language
    pub target: Target,
    /// Stage the shader runs in
    #[builder(default = "ShaderKind::Fragment")]
    pub shader_kind: ShaderKind,
    /// Expression and statement nesting ceiling
    #[builder(default = "256")]
    pub max_depth: usize,
    /// Counted loops with more iterations than this are split into chunks;
    /// zero disables chunking
    #[builder(default = "255")]
    pub max_loop_iterations: u32,
    /// Type name of the gathered default-block uniform structure
    #[builder(default = "\"Uniforms\".to_owned()")]
    pub uniform_block_name: String,
    /// Instance name of the gathered uniform block
    #[builder(default = "format!(\"{}_uniforms\", crate::PREFIX)")]
    pub uniform_instance_name: String,
}

impl CompileOptions {
    /// Builder with `target` as the only required field
    pub fn builder() -> CompileOptionsBuilder {
        CompileOptionsBuilder::default()
    }
}

/// Translate a resolved shader tree into source for `options.target`
pub fn translate(
    root: &mut Node,
    ctx: &mut Context,
    symbols: &mut SymbolTable,
    options: &CompileOptions,
) -> Result<String> {
    info!(
        "translating {:?} shader to {}",
        options.shader_kind, options.target
    );

    ctx.limits.max_depth = options.max_depth;
    check_stage(root, options.shader_kind)?;

    let target = options.target;

    separate_declarations(root, ctx)?;
    gather_uniforms(
        root,
        ctx,
        symbols,
        &options.uniform_block_name,
        &options.uniform_instance_name,
    )?;
    rewrite_out_parameters(root, ctx)?;

    let kinds = extract_kinds(target);
    if kinds.ternaries || kinds.commas {
        extract_expressions(root, ctx, kinds)?;
    }

    split_swizzles(root, ctx)?;
    broadcast_scalars(root, ctx, broadcast_rules(target))?;

    // WGSL value parameters are immutable; writes are redirected to a copy.
    if target == Target::Wgsl {
        materialize_params(root, ctx)?;
    }

    if options.max_loop_iterations > 0 {
        chunk_loops(root, ctx, options.max_loop_iterations)?;
    }

    prune_no_ops(root, ctx)?;

    debug!("rewrites done, validating before emission");
    validate(root, ctx, &ValidateOptions::default())?;

    emit::emit(root, ctx, target)
}

fn extract_kinds(target: Target) -> ExtractKinds {
    match target {
        // WGSL has neither a select with short-circuit semantics nor a comma
        // operator.
        Target::Wgsl => ExtractKinds {
            ternaries: true,
            commas: true,
        },
        Target::Hlsl | Target::Msl => ExtractKinds {
            ternaries: false,
            commas: false,
        },
    }
}

fn broadcast_rules(target: Target) -> BroadcastRules {
    match target {
        Target::Wgsl => BroadcastRules {
            vectors: true,
            matrices: true,
        },
        // MSL splats scalars against vectors but has no scalar-matrix
        // addition.
        Target::Msl => BroadcastRules {
            vectors: false,
            matrices: true,
        },
        Target::Hlsl => BroadcastRules {
            vectors: false,
            matrices: false,
        },
    }
}

/// Reject fragment-only constructs in a vertex shader before any rewriting
fn check_stage(root: &Node, kind: ShaderKind) -> Result<()> {
    if kind == ShaderKind::Fragment {
        return Ok(());
    }

    fn walk(node: &Node) -> Result<()> {
        match &node.kind {
            NodeKind::Branch {
                kind: BranchKind::Discard,
                ..
            } => {
                return Err(Error::WrongStage {
                    construct: "discard".to_owned(),
                })
            }
            NodeKind::Call {
                target: CallTarget::Builtin(op),
                ..
            } if matches!(op, BuiltinOp::DFdx | BuiltinOp::DFdy | BuiltinOp::Fwidth) => {
                return Err(Error::WrongStage {
                    construct: op.glsl_name().to_owned(),
                })
            }
            _ => {}
        }
        for child in node.children() {
            walk(child)?;
        }
        Ok(())
    }

    walk(root)
}
