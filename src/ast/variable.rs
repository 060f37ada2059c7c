//! Variable, function and struct records referenced from the tree by id.
//!
//! Symbol nodes store a [VariableId] back-reference instead of an owning
//! pointer; two symbol nodes carrying the same id are aliases of the same
//! underlying variable. Replacing a variable means queueing a replacement for
//! every referencing symbol node, never mutating the record in place.

use super::ty::Type;

/// Stable identity of a variable record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub u32);

/// Stable identity of a function record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u32);

/// Stable identity of a struct or interface block field list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructId(pub u32);

/// Origin of a named entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Declared in the source shader
    UserDefined,
    /// Provided by the shading language
    BuiltIn,
    /// Synthesized by a transformation pass
    Internal,
}

/// Named entity referenced by symbol nodes
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
}

/// Parameter passing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    In,
    Out,
    InOut,
    Const,
}

impl ParamDirection {
    /// True when the callee may write through this parameter
    pub fn is_output(self) -> bool {
        matches!(self, ParamDirection::Out | ParamDirection::InOut)
    }

    /// True when the caller's value is observable in the callee
    pub fn is_input(self) -> bool {
        !matches!(self, ParamDirection::Out)
    }
}

/// One declared function parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    pub var: VariableId,
    pub direction: ParamDirection,
}

/// Function signature record
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub parameters: Vec<Parameter>,
    pub kind: SymbolKind,
}

/// One field of a struct or interface block
#[derive(Debug, Clone)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
}

/// Struct or interface block field list
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<StructField>,
}

/// Arena of variable records, keyed by [VariableId]
#[derive(Debug, Default, Clone)]
pub struct VariableArena {
    records: Vec<Variable>,
}

impl VariableArena {
    pub fn declare(&mut self, name: impl Into<String>, ty: Type, kind: SymbolKind) -> VariableId {
        let id = VariableId(self.records.len() as u32);
        self.records.push(Variable {
            name: name.into(),
            ty,
            kind,
        });
        id
    }

    pub fn get(&self, id: VariableId) -> &Variable {
        &self.records[id.0 as usize]
    }

    pub fn try_get(&self, id: VariableId) -> Option<&Variable> {
        self.records.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: VariableId) -> &mut Variable {
        &mut self.records[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, v)| (VariableId(i as u32), v))
    }
}

/// Arena of function records, keyed by [FunctionId]
#[derive(Debug, Default, Clone)]
pub struct FunctionArena {
    records: Vec<Function>,
}

impl FunctionArena {
    pub fn declare(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.records.len() as u32);
        self.records.push(function);
        id
    }

    pub fn get(&self, id: FunctionId) -> &Function {
        &self.records[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.records[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, f)| (FunctionId(i as u32), f))
    }
}

/// Registry of struct and interface block field lists
#[derive(Debug, Default, Clone)]
pub struct StructRegistry {
    defs: Vec<StructDef>,
}

impl StructRegistry {
    pub fn declare(&mut self, def: StructDef) -> StructId {
        let id = StructId(self.defs.len() as u32);
        self.defs.push(def);
        id
    }

    pub fn get(&self, id: StructId) -> &StructDef {
        &self.defs[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: StructId) -> &mut StructDef {
        &mut self.defs[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (StructId, &StructDef)> {
        self.defs
            .iter()
            .enumerate()
            .map(|(i, d)| (StructId(i as u32), d))
    }
}
