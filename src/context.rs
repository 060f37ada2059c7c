//! Per-compilation allocation and identity context.
//!
//! One compilation owns one `Context`; nothing is shared between concurrent
//! compilations. Every node, variable, function and struct allocation goes
//! through it, which is what makes node identity and synthesized names stable
//! and predictable across repeated runs on the same tree shape.

use crate::ast::{
    Function, FunctionArena, NodeId, ParamDirection, Parameter, StructRegistry, SymbolKind, Type,
    VariableArena, VariableId,
};

/// Hard ceilings applied during traversal and fixed-point iteration
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum expression/statement nesting depth before translation aborts
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_depth: 256 }
    }
}

/// Compilation-scoped identity and arena owner
#[derive(Debug, Default)]
pub struct Context {
    pub variables: VariableArena,
    pub functions: FunctionArena,
    pub structs: StructRegistry,
    pub limits: Limits,
    next_node_id: u64,
    temporary_index: u32,
    helper_index: u32,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh node id
    pub fn make_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Current temporary index; one traversal uses at most one temporary name
    /// derived from it
    pub fn temporary_index(&self) -> u32 {
        self.temporary_index
    }

    /// Advance the temporary counter. Called explicitly by a pass between
    /// uses, not automatically per temp-symbol request.
    pub fn next_temporary(&mut self) {
        self.temporary_index += 1;
    }

    /// Declare the internal temporary variable for the current index
    pub fn temp_variable(&mut self, ty: Type) -> VariableId {
        let name = format!("{}{}", crate::PREFIX, self.temporary_index);
        self.variables.declare(name, ty, SymbolKind::Internal)
    }

    /// Declare a synthesized helper function with a fresh, stable name
    pub fn helper_function(
        &mut self,
        stem: &str,
        return_type: Type,
        parameters: Vec<Parameter>,
    ) -> crate::ast::FunctionId {
        let name = format!("{}_{}{}", crate::PREFIX, stem, self.helper_index);
        self.helper_index += 1;

        self.functions.declare(Function {
            name,
            return_type,
            parameters,
            kind: SymbolKind::Internal,
        })
    }

    /// Declare an internal parameter variable for a synthesized function
    pub fn internal_param(&mut self, name: &str, ty: Type, direction: ParamDirection) -> Parameter {
        let qualifier = match direction {
            ParamDirection::In => crate::ast::Qualifier::ParamIn,
            ParamDirection::Out => crate::ast::Qualifier::ParamOut,
            ParamDirection::InOut => crate::ast::Qualifier::ParamInOut,
            ParamDirection::Const => crate::ast::Qualifier::ParamConst,
        };

        let var = self.variables.declare(
            name.to_owned(),
            ty.with_qualifier(qualifier),
            SymbolKind::Internal,
        );

        Parameter {
            var,
            direction,
        }
    }
}
