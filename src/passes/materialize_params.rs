//! Give written value parameters a mutable local backing store.
//!
//! GLSL `in` parameters are plain mutable locals inside the callee. Targets
//! whose function parameters are immutable need a local copy instead: the
//! pass declares one at the top of the body, initialized from the parameter,
//! and redirects every use in the body to the copy. Parameters the body never
//! writes keep their direct uses.

use std::collections::BTreeMap;

use log::debug;

use crate::ast::{build, Node, NodeKind, Qualifier, SymbolKind, VariableId};
use crate::context::Context;
use crate::error::Result;
use crate::traverse::{apply, traverse, Traverse, Traverser, ValidateOptions, VisitPhase, Visitor};

use super::collect_references;

#[derive(Default)]
struct MaterializeParams {
    /// Written parameter -> its local copy, for the function being visited
    copies: BTreeMap<VariableId, VariableId>,
}

impl Visitor for MaterializeParams {
    fn visit_function_definition(
        &mut self,
        t: &mut Traverser,
        phase: VisitPhase,
        node: &Node,
    ) -> Traverse {
        let (function, body) = match &node.kind {
            NodeKind::FunctionDefinition { function, body } => (*function, body),
            _ => return Traverse::Children,
        };

        match phase {
            VisitPhase::Pre => {
                self.copies.clear();

                let first_statement = match &body.kind {
                    NodeKind::Block { statements } => match statements.first() {
                        Some(stmt) => stmt.id,
                        None => return Traverse::Skip,
                    },
                    _ => return Traverse::Skip,
                };

                let mut reads = BTreeMap::new();
                let mut writes = BTreeMap::new();
                collect_references(body, t.ctx, false, &mut reads, &mut writes);

                // Out and inout parameters stay writable on every target;
                // only written value parameters need the copy.
                let written: Vec<VariableId> = t
                    .ctx
                    .functions
                    .get(function)
                    .parameters
                    .iter()
                    .filter(|p| !p.direction.is_output() && writes.contains_key(&p.var))
                    .map(|p| p.var)
                    .collect();

                if written.is_empty() {
                    return Traverse::Children;
                }

                debug!(
                    "materializing {} written parameters of {}",
                    written.len(),
                    t.ctx.functions.get(function).name
                );

                let mut declarations = Vec::new();
                for param in written {
                    let record = t.ctx.variables.get(param);
                    let name = format!("{}_{}", crate::PREFIX, record.name);
                    let ty = record.ty.clone().with_qualifier(Qualifier::Temporary);

                    let copy = t.ctx.variables.declare(name, ty, SymbolKind::Internal);
                    let initial = build::symbol(t.ctx, param);
                    declarations.push(build::declare_init(t.ctx, copy, initial));

                    self.copies.insert(param, copy);
                }

                t.insert_around(body.id, first_statement, declarations, Vec::new());
                Traverse::Children
            }
            VisitPhase::In => Traverse::Children,
            VisitPhase::Post => {
                self.copies.clear();
                Traverse::Children
            }
        }
    }

    fn visit_symbol(&mut self, t: &mut Traverser, node: &Node) {
        if let NodeKind::Symbol(var) = &node.kind {
            if let Some(copy) = self.copies.get(var).copied() {
                if let Some(parent) = t.parent() {
                    let replacement = build::symbol(t.ctx, copy);
                    t.queue_replacement(parent, node.id, replacement);
                }
            }
        }
    }
}

/// Copy written value parameters into mutable locals and redirect their uses
pub fn materialize_params(root: &mut Node, ctx: &mut Context) -> Result<()> {
    let mut visitor = MaterializeParams::default();
    let mut t = Traverser::new(ctx);
    traverse(root, &mut visitor, &mut t);
    let edits = t.finish()?;
    apply(root, edits, ctx)?;

    crate::traverse::validate(root, ctx, &ValidateOptions::default())
}
