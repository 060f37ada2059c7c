use thiserror::Error;

use crate::ast::{NodeId, VariableId};
use crate::emit::Target;

/// GLSLX translation error type
#[derive(Debug, Error)]
pub enum Error {
    /// Expression or statement nesting exceeded the configured ceiling
    #[error("shader too deeply nested: depth {depth} exceeds the limit of {limit}")]
    TooDeeplyNested {
        /// Depth reached when the traversal gave up
        depth: usize,
        /// Configured nesting ceiling
        limit: usize,
    },
    /// A queued mutation referenced a parent or child that is no longer in the tree
    #[error("stale mutation: node {child:?} is not a child of {parent:?} at apply time")]
    StaleMutation {
        /// Parent the mutation was queued against
        parent: NodeId,
        /// Child that should have been found under the parent
        child: NodeId,
    },
    /// A queued multi-replacement targeted a single-child slot
    #[error("multi-replacement of {count} nodes targets a single-child slot of {parent:?}")]
    InvalidMultiReplacement {
        /// Parent the mutation was queued against
        parent: NodeId,
        /// Number of replacement nodes
        count: usize,
    },
    /// A fixed-point pass did not converge within the iteration cap
    #[error("pass {pass} did not reach a fixed point after {iterations} iterations")]
    FixedPointDivergence {
        /// Name of the diverging pass
        pass: &'static str,
        /// Number of iterations performed before giving up
        iterations: usize,
    },
    /// The same node object is reachable from two parents
    #[error("node {0:?} is owned by more than one parent")]
    DuplicateOwnership(NodeId),
    /// A symbol references a variable that was never declared in an enclosing scope
    #[error("dangling reference to variable {name}")]
    DanglingReference {
        /// Name of the referenced variable
        name: String,
    },
    /// A symbol references a variable id outside the arena
    #[error("unknown variable id {0:?}")]
    UnknownVariable(VariableId),
    /// A declaration holds more than one declarator where a single one is required
    #[error("declaration with {count} declarators; the separate-declarations pass must run first")]
    MultipleDeclarators {
        /// Number of declarators found
        count: usize,
    },
    /// A declaration holds a child that is neither a symbol nor an initializer
    #[error("malformed declaration child {0:?}")]
    MalformedDeclaration(NodeId),
    /// Swizzle assignment nested inside a larger expression
    #[error("swizzled assignment target used inside a larger expression is not supported")]
    NestedSwizzleAssignment,
    /// The same variable is bound to two out parameters of one call
    #[error("variable {name} aliased through two out parameters of a single call")]
    AliasedOutParameters {
        /// Name of the aliased variable
        name: String,
    },
    /// A fragment-stage construct appeared in a vertex shader
    #[error("{construct} is not available in a vertex shader")]
    WrongStage {
        /// Offending construct, as spelled in the source language
        construct: String,
    },
    /// A source construct has no correct mapping to the requested target
    #[error("construct has no {target} equivalent: {construct}")]
    UnsupportedConstruct {
        /// Target the construct could not be mapped to
        target: Target,
        /// Description of the offending construct
        construct: String,
    },
    /// An operator/shape combination the emitter tables do not cover
    #[error("unimplemented {target} mapping for operator {operator}")]
    UnimplementedOperator {
        /// Target being emitted
        target: Target,
        /// Operator spelling in the source language
        operator: String,
    },
    /// Programming error in a pass or emitter, not a user-shader error
    #[error("internal error: {0}")]
    Internal(String),
}

/// GLSLX Result
pub type Result<T> = std::result::Result<T, Error>;
