//! Emission order for struct declarations.
//!
//! Targets require a struct to be declared before any struct that embeds it.
//! Field references between registered structs form a DAG; a post-order walk
//! from the set of structs the output actually uses yields a
//! dependencies-first declaration order restricted to that set.

use bimap::BiMap;
use log::trace;
use petgraph::graph::NodeIndex;
use petgraph::visit::DfsPostOrder;

use crate::ast::StructId;
use crate::context::Context;

#[derive(Default, Debug, Clone)]
pub struct StructOrder {
    id_map: BiMap<StructId, usize>,
    graph: petgraph::Graph<(), (), petgraph::Directed>,
}

impl StructOrder {
    pub fn declare(&mut self, structure: StructId) -> usize {
        if let Some(id) = self.id_map.get_by_left(&structure) {
            *id
        } else {
            let id = self.graph.add_node(()).index();
            self.id_map.insert(structure, id);
            id
        }
    }

    pub fn add_dep(&mut self, scope: StructId, dependency: StructId) {
        // Struct definitions cannot be recursive.
        assert!(scope != dependency);

        trace!("StructOrder: add_dep {:?} -> {:?}", scope, dependency);

        let scope = self.declare(scope);
        let dependency = self.declare(dependency);
        self.graph
            .add_edge(NodeIndex::new(scope), NodeIndex::new(dependency), ());
    }

    /// Dependencies-first order covering `wanted` and everything it embeds
    pub fn into_order(mut self, wanted: &[StructId]) -> Vec<StructId> {
        let wanted_id = self.graph.add_node(());

        for structure in wanted {
            let id = self.declare(*structure);
            self.graph.add_edge(wanted_id, NodeIndex::new(id), ());
        }

        let mut dfs = DfsPostOrder::new(&self.graph, wanted_id);
        let mut res = Vec::with_capacity(self.id_map.len());

        while let Some(nx) = dfs.next(&self.graph) {
            // if let because the synthetic root has no associated struct
            if let Some(entry) = self.id_map.remove_by_right(&nx.index()) {
                res.push(entry.0);
            }
        }

        res
    }
}

/// Declaration order for `wanted` and their embedded structs, built from the
/// field lists registered in `ctx`
pub fn ordered_structs(ctx: &Context, wanted: &[StructId]) -> Vec<StructId> {
    let mut order = StructOrder::default();

    for (id, def) in ctx.structs.iter() {
        order.declare(id);
        for field in &def.fields {
            if let Some(embedded) = field.ty.struct_id {
                order.add_dep(id, embedded);
            }
        }
    }

    order.into_order(wanted)
}
