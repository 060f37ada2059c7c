//! Post-mutation tree consistency checking.
//!
//! Run after a pass applies its edits; catches the classes of corruption a
//! rewrite bug produces: duplicated node ownership, dangling variable
//! references, malformed declarations.

use std::collections::HashSet;

use crate::ast::{BinaryOp, Node, NodeId, NodeKind, Qualifier, SymbolKind, VariableId};
use crate::context::Context;
use crate::error::{Error, Result};

/// What the validator checks, and which rules are relaxed.
#[derive(Debug, Default, Clone)]
pub struct ValidateOptions {
    /// Skip scope checking entirely; structural checks still run
    pub skip_scope_check: bool,
    /// Variables exempt from scope checking, for rewrites that intentionally
    /// reference a variable ahead of a declaration the emitter synthesizes
    pub relaxed: HashSet<VariableId>,
}

struct ValidateState<'c> {
    ctx: &'c Context,
    options: &'c ValidateOptions,
    seen: HashSet<NodeId>,
    scopes: Vec<HashSet<VariableId>>,
}

impl<'c> ValidateState<'c> {
    fn declared(&self, var: VariableId) -> bool {
        self.scopes.iter().rev().any(|s| s.contains(&var))
    }

    fn declare(&mut self, var: VariableId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(var);
        }
    }

    fn check(&mut self, node: &Node) -> Result<()> {
        if node.id == NodeId::PLACEHOLDER {
            return Err(Error::Internal(
                "placeholder node left in the tree after apply".to_owned(),
            ));
        }

        if !self.seen.insert(node.id) {
            return Err(Error::DuplicateOwnership(node.id));
        }

        match &node.kind {
            NodeKind::Symbol(var) => {
                let record = self
                    .ctx
                    .variables
                    .try_get(*var)
                    .ok_or(Error::UnknownVariable(*var))?;

                if !self.options.skip_scope_check
                    && record.kind != SymbolKind::BuiltIn
                    && !self.options.relaxed.contains(var)
                    && !global_qualifier(record.ty.qualifier)
                    && !self.declared(*var)
                {
                    return Err(Error::DanglingReference {
                        name: record.name.clone(),
                    });
                }
            }

            NodeKind::Declaration { declarators } => {
                // Declarator symbols are declarations, not references, so
                // they are registered for ownership but not scope-checked.
                for d in declarators {
                    if !self.seen.insert(d.id) {
                        return Err(Error::DuplicateOwnership(d.id));
                    }

                    match &d.kind {
                        NodeKind::Symbol(var) => self.declare(*var),
                        NodeKind::Binary {
                            op: BinaryOp::Initialize,
                            left,
                            right,
                        } => {
                            // The initializer is checked before the declared
                            // symbol becomes visible.
                            self.check(right)?;
                            match &left.kind {
                                NodeKind::Symbol(var) => {
                                    if !self.seen.insert(left.id) {
                                        return Err(Error::DuplicateOwnership(left.id));
                                    }
                                    self.declare(*var);
                                }
                                _ => return Err(Error::MalformedDeclaration(d.id)),
                            }
                        }
                        _ => return Err(Error::MalformedDeclaration(d.id)),
                    }
                }
                return Ok(());
            }

            NodeKind::Block { .. } | NodeKind::Loop { .. } => {
                self.scopes.push(HashSet::new());
                for child in node.children() {
                    self.check(child)?;
                }
                self.scopes.pop();
                return Ok(());
            }

            NodeKind::FunctionDefinition { function, body } => {
                self.scopes.push(HashSet::new());
                let params: Vec<VariableId> = self
                    .ctx
                    .functions
                    .get(*function)
                    .parameters
                    .iter()
                    .map(|p| p.var)
                    .collect();
                for p in params {
                    self.declare(p);
                }
                self.check(body)?;
                self.scopes.pop();
                return Ok(());
            }

            _ => {}
        }

        for child in node.children() {
            self.check(child)?;
        }

        Ok(())
    }
}

fn global_qualifier(qualifier: Qualifier) -> bool {
    matches!(
        qualifier,
        Qualifier::Uniform
            | Qualifier::Attribute
            | Qualifier::VaryingIn
            | Qualifier::VaryingOut
            | Qualifier::BuiltIn
            | Qualifier::Global
            | Qualifier::Const
    )
}

/// Walk the tree checking ownership, reference and declaration invariants
pub fn validate(root: &Node, ctx: &Context, options: &ValidateOptions) -> Result<()> {
    let mut state = ValidateState {
        ctx,
        options,
        seen: HashSet::new(),
        scopes: vec![HashSet::new()],
    };

    state.check(root)
}
