//! Symbol table boundary.
//!
//! The parser owns name resolution; what the passes and emitters consume is a
//! read-mostly service: builtin lookup, usage marking and enumeration of the
//! global scope in declaration order.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::VariableId;

/// Global-scope symbol service handed to passes alongside the tree
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    globals: IndexMap<String, VariableId>,
    used: HashSet<VariableId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global-scope variable under its source name
    pub fn declare_global(&mut self, name: impl Into<String>, var: VariableId) {
        self.globals.insert(name.into(), var);
    }

    /// Look up a global by name
    pub fn find(&self, name: &str) -> Option<VariableId> {
        self.globals.get(name).copied()
    }

    /// Re-point a name at a replacement variable, as when a pass overrides a
    /// built-in's effective type
    pub fn redeclare(&mut self, name: &str, var: VariableId) {
        self.globals.insert(name.to_owned(), var);
    }

    /// Record that a variable is referenced by the shader
    pub fn mark_used(&mut self, var: VariableId) {
        self.used.insert(var);
    }

    /// True when [mark_used](SymbolTable::mark_used) was called for this variable
    pub fn is_used(&self, var: VariableId) -> bool {
        self.used.contains(&var)
    }

    /// Global-scope variables in declaration order
    pub fn globals(&self) -> impl Iterator<Item = (&str, VariableId)> {
        self.globals.iter().map(|(n, v)| (n.as_str(), *v))
    }
}
