//! glslx is a GLSL ES translation core: it takes a resolved, typed shader
//! tree and rewrites it until the result can be printed as HLSL, MSL or WGSL
//! source.
//!
//! The crate does not parse GLSL. A front end builds the [ast::Node] tree and
//! the [context::Context] arenas, then hands both to [compile::translate],
//! which runs the rewrite passes for the requested [emit::Target] and returns
//! the output text.
//!
//! # Structure
//!
//! - [ast] — the node model and tree builders
//! - [traverse] — visitor traversal with a deferred mutation queue
//! - [passes] — target-independent rewrites (out parameters, swizzled
//!   stores, expression extraction, uniform gathering, loop chunking)
//! - [builtins] — emulation catalog for builtins a target lacks
//! - [emit] — one output backend per target
//! - [compile] — the pipeline tying the above together

pub mod ast;
pub mod builtins;
pub mod compile;
pub mod context;
pub mod emit;
pub mod error;
pub mod passes;
pub mod sink;
pub mod symbol;
pub mod traverse;

pub use compile::{translate, CompileOptions, CompileOptionsBuilder, ShaderKind};
pub use context::Context;
pub use emit::Target;
pub use error::{Error, Result};
pub use symbol::SymbolTable;

/// Prefix for every name the pipeline synthesizes. No valid ES shader
/// identifier starts with it, so generated names cannot collide with user
/// symbols.
pub const PREFIX: &str = "sx";
