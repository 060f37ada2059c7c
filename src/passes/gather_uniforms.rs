//! Gather default-block uniforms into one synthesized interface block.
//!
//! Every active non-opaque uniform declared outside a block is collected, in
//! declaration order, into a single block; each use-site becomes a field
//! access through the block instance. Field order is insertion order, which
//! downstream byte-offset computation relies on.

use indexmap::IndexMap;
use log::debug;

use crate::ast::{
    build, BasicType, Node, NodeId, NodeKind, Qualifier, StructDef, StructField, SymbolKind, Type,
    VariableId,
};
use crate::context::Context;
use crate::error::Result;
use crate::symbol::SymbolTable;
use crate::traverse::{apply, traverse, Traverse, Traverser, ValidateOptions, VisitPhase, Visitor};

/// Top-level uniform declarations eligible for gathering, plus use counts
#[derive(Default)]
struct FindUniforms {
    /// Declaration order is preserved through the IndexMap
    candidates: IndexMap<VariableId, NodeId>,
    uses: IndexMap<VariableId, usize>,
}

impl Visitor for FindUniforms {
    fn visit_declaration(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase != VisitPhase::Pre {
            return Traverse::Children;
        }

        // Only declarations directly at the top level are candidates. Their
        // declarator symbols are declarations rather than uses, so they are
        // skipped entirely.
        if t.block_nesting() == 1 && t.current_statement() == Some(node.id) {
            if let NodeKind::Declaration { declarators } = &node.kind {
                if let Some(var) = declarators.first().and_then(super::declared_variable) {
                    let record = t.ctx.variables.get(var);
                    if record.ty.qualifier == Qualifier::Uniform
                        && !record.ty.is_opaque()
                        && record.ty.basic != BasicType::InterfaceBlock
                    {
                        // Candidates must be in split form by now.
                        match super::expect_single_declarator(node) {
                            Ok(_) => {
                                self.candidates.insert(var, node.id);
                            }
                            Err(err) => t.set_error(err),
                        }
                        return Traverse::Skip;
                    }
                }
            }
        }

        Traverse::Children
    }

    fn visit_symbol(&mut self, _t: &mut Traverser, node: &Node) {
        if let NodeKind::Symbol(var) = &node.kind {
            *self.uses.entry(*var).or_insert(0) += 1;
        }
    }
}

/// Single-traversal rewrite: gathered declarations are deleted (the first is
/// replaced by the block declaration) and every use-site becomes a field
/// access through the block instance
struct GatherRewrite<'g> {
    field_of: &'g IndexMap<VariableId, u32>,
    declarations: &'g IndexMap<VariableId, NodeId>,
    block_instance: VariableId,
    block_declaration: Option<Node>,
}

impl Visitor for GatherRewrite<'_> {
    fn visit_declaration(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        if phase != VisitPhase::Pre {
            return Traverse::Children;
        }

        if let Some(pos) = self.declarations.values().position(|d| *d == node.id) {
            if let Some(block) = t.parent_block() {
                if pos == 0 {
                    if let Some(decl) = self.block_declaration.take() {
                        t.queue_replacement(block, node.id, decl);
                    }
                } else {
                    t.queue_multi_replacement(block, node.id, Vec::new());
                }
            }

            return Traverse::Skip;
        }

        Traverse::Children
    }

    fn visit_symbol(&mut self, t: &mut Traverser, node: &Node) {
        if let NodeKind::Symbol(var) = &node.kind {
            if let Some(field) = self.field_of.get(var).copied() {
                if let Some(parent) = t.parent() {
                    // v  ->  instance.v
                    let base = build::symbol(t.ctx, self.block_instance);
                    let access = build::index_field(t.ctx, base, field);
                    t.queue_replacement(parent, node.id, access);
                }
            }
        }
    }
}

/// Move active default-block uniforms into one interface block named
/// `block_name`, instanced as `instance_name`
pub fn gather_uniforms(
    root: &mut Node,
    ctx: &mut Context,
    symbols: &mut SymbolTable,
    block_name: &str,
    instance_name: &str,
) -> Result<()> {
    // First traversal: find candidates and count uses.
    let mut finder = FindUniforms::default();
    let mut t = Traverser::new(ctx);
    traverse(root, &mut finder, &mut t);
    t.finish()?;

    // Uniforms cannot be self-initialized and declarator symbols were not
    // counted, so any use count above zero is a genuine reference.
    let active: IndexMap<VariableId, NodeId> = finder
        .candidates
        .iter()
        .filter(|(var, _)| finder.uses.get(*var).copied().unwrap_or(0) > 0)
        .map(|(var, decl)| (*var, *decl))
        .collect();

    if active.is_empty() {
        return Ok(());
    }

    debug!(
        "gathering {} active uniforms into {}",
        active.len(),
        block_name
    );

    for var in active.keys() {
        symbols.mark_used(*var);
    }

    // Synthesize the block field list in declaration order. Fields get their
    // own field-variable types; the uniform qualifier stays on the block.
    let mut fields = Vec::new();
    let mut field_of: IndexMap<VariableId, u32> = IndexMap::new();
    for (index, var) in active.keys().enumerate() {
        let record = ctx.variables.get(*var);
        fields.push(StructField {
            name: record.name.clone(),
            ty: record.ty.clone().with_qualifier(Qualifier::Temporary),
        });
        field_of.insert(*var, index as u32);
    }

    let struct_id = ctx.structs.declare(StructDef {
        name: block_name.to_owned(),
        fields,
    });

    let instance = ctx.variables.declare(
        instance_name.to_owned(),
        Type::interface_block(struct_id).with_qualifier(Qualifier::Uniform),
        SymbolKind::Internal,
    );
    symbols.declare_global(instance_name, instance);

    let block_declaration = build::declare(ctx, instance);

    // Second traversal: queue the declaration rewrite and every use-site
    // replacement, then apply in one batch.
    let mut rewrite = GatherRewrite {
        field_of: &field_of,
        declarations: &active,
        block_instance: instance,
        block_declaration: Some(block_declaration),
    };
    let mut t = Traverser::new(ctx);
    traverse(root, &mut rewrite, &mut t);
    let edits = t.finish()?;
    apply(root, edits, ctx)?;

    crate::traverse::validate(root, ctx, &ValidateOptions::default())
}
