//! In-memory fact graph, indexed for lookup by id, kind and endpoint.
//!
//! Built from the four fact tables (base and inferred unioned) after every
//! property and edge endpoint has been checked against the node and edge
//! records. Properties are an ordered mapping: a repeated key overwrites the
//! earlier value in place.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{debug, warn};

use crate::demangle::Demangler;
use crate::facts::{
    read_fact_dir_with_inferred, EdgeId, EdgeKind, FactError, FactResult, FactSet, NodeId, NodeKind,
};

pub const NAME: &str = "name";
pub const DEMANGLED_NAME: &str = "demangled_name";
pub const IDX: &str = "idx";

/// Insertion-ordered string properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub props: Properties,
}

impl Node {
    /// `demangled_name`, else `name`, else `idx`, else empty.
    pub fn display_name(&self) -> &str {
        [DEMANGLED_NAME, NAME, IDX]
            .iter()
            .filter_map(|key| self.props.get(key))
            .find(|value| !value.is_empty())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub src: NodeId,
    pub dst: NodeId,
    pub props: Properties,
}

#[derive(Debug, Default)]
pub struct FactGraph {
    nodes: Vec<Node>,
    node_index: HashMap<NodeId, usize>,
    nodes_by_kind: HashMap<NodeKind, Vec<usize>>,
    edges: Vec<Edge>,
    edge_index: HashMap<EdgeId, usize>,
    edges_by_kind: HashMap<EdgeKind, Vec<usize>>,
    outgoing: HashMap<NodeId, Vec<usize>>,
    incoming: HashMap<NodeId, Vec<usize>>,
}

impl FactGraph {
    /// Build a graph from a fact set, rejecting dangling properties and edges.
    ///
    /// A node or edge id recorded twice keeps its first record.
    pub fn from_facts(facts: FactSet) -> FactResult<Self> {
        let mut graph = FactGraph::default();

        for record in facts.nodes {
            if graph.node_index.contains_key(&record.id) {
                continue;
            }
            let idx = graph.nodes.len();
            graph.node_index.insert(record.id.clone(), idx);
            graph.nodes_by_kind.entry(record.kind.clone()).or_default().push(idx);
            graph.nodes.push(Node {
                id: record.id,
                kind: record.kind,
                props: Properties::default(),
            });
        }

        for prop in facts.node_props {
            let idx = *graph.node_index.get(&prop.id).ok_or_else(|| {
                FactError::DanglingProperty { id: prop.id.0.clone(), key: prop.key.clone() }
            })?;
            graph.nodes[idx].props.set(prop.key, prop.value);
        }

        for record in facts.edges {
            if graph.edge_index.contains_key(&record.id) {
                continue;
            }
            for endpoint in [&record.src, &record.dst] {
                if !graph.node_index.contains_key(endpoint) {
                    return Err(FactError::DanglingEdge {
                        edge: record.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
            let idx = graph.edges.len();
            graph.edge_index.insert(record.id.clone(), idx);
            graph.edges_by_kind.entry(record.kind.clone()).or_default().push(idx);
            graph.outgoing.entry(record.src.clone()).or_default().push(idx);
            graph.incoming.entry(record.dst.clone()).or_default().push(idx);
            graph.edges.push(Edge {
                id: record.id,
                kind: record.kind,
                src: record.src,
                dst: record.dst,
                props: Properties::default(),
            });
        }

        for prop in facts.edge_props {
            let idx = *graph.edge_index.get(&prop.id).ok_or_else(|| {
                FactError::DanglingProperty { id: prop.id.0.clone(), key: prop.key.clone() }
            })?;
            graph.edges[idx].props.set(prop.key, prop.value);
        }

        debug!(nodes = graph.nodes.len(), edges = graph.edges.len(), "fact graph built");
        Ok(graph)
    }

    /// Load base facts from `dir`, unioned with any inferred facts beside them.
    pub fn load_dir(dir: &Path) -> FactResult<Self> {
        Self::from_facts(read_fact_dir_with_inferred(dir)?)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edge_index.get(id).map(|&idx| &self.edges[idx])
    }

    /// Nodes in the order their records were loaded.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes_of_kind<'a>(&'a self, kind: &NodeKind) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes_by_kind.get(kind).into_iter().flatten().map(move |&idx| &self.nodes[idx])
    }

    pub fn edges_of_kind<'a>(&'a self, kind: &EdgeKind) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges_by_kind.get(kind).into_iter().flatten().map(move |&idx| &self.edges[idx])
    }

    pub fn edges_from<'a>(&'a self, src: &NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.outgoing.get(src).into_iter().flatten().map(move |&idx| &self.edges[idx])
    }

    pub fn edges_to<'a>(&'a self, dst: &NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.incoming.get(dst).into_iter().flatten().map(move |&idx| &self.edges[idx])
    }

    /// Edges running from `src` to `dst`, in load order.
    pub fn edges_between<'a>(
        &'a self,
        src: &NodeId,
        dst: &'a NodeId,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges_from(src).filter(move |edge| &edge.dst == dst)
    }

    /// Node counts per kind, sorted by kind name.
    pub fn node_kind_counts(&self) -> BTreeMap<String, usize> {
        self.nodes_by_kind.iter().map(|(kind, idxs)| (kind.to_string(), idxs.len())).collect()
    }

    /// Edge counts per kind, sorted by kind name.
    pub fn edge_kind_counts(&self) -> BTreeMap<String, usize> {
        self.edges_by_kind.iter().map(|(kind, idxs)| (kind.to_string(), idxs.len())).collect()
    }

    /// Display name of `id`, or the empty string for unknown ids.
    pub fn display_name(&self, id: &NodeId) -> &str {
        self.node(id).map(Node::display_name).unwrap_or("")
    }

    /// Resolve a function by name: substring match on `name` across every
    /// `Function` node first, then on `demangled_name`. First hit in load
    /// order wins.
    pub fn find_function(&self, needle: &str) -> Option<&NodeId> {
        [NAME, DEMANGLED_NAME].iter().find_map(|key| {
            self.nodes_of_kind(&NodeKind::Function)
                .find(|node| node.props.get(key).is_some_and(|value| value.contains(needle)))
                .map(|node| &node.id)
        })
    }

    /// Record `demangled_name` for each named node whose demangled form
    /// differs from its raw `name`. `demangled` pairs up with `named_nodes()`.
    pub fn apply_demangled(&mut self, demangled: &[String]) {
        let targets: Vec<usize> = self.named_node_indices().collect();
        if targets.len() != demangled.len() {
            warn!(
                expected = targets.len(),
                found = demangled.len(),
                "demangled name count does not match named nodes; skipping"
            );
            return;
        }
        let mut applied = 0usize;
        for (idx, pretty) in targets.into_iter().zip(demangled) {
            let node = &mut self.nodes[idx];
            if node.props.get(NAME) != Some(pretty.as_str()) {
                node.props.set(DEMANGLED_NAME, pretty.as_str());
                applied += 1;
            }
        }
        debug!(applied, "applied demangled names");
    }

    /// Raw `name` of every node that has one, in load order.
    pub fn named_nodes(&self) -> Vec<String> {
        self.named_node_indices()
            .filter_map(|idx| self.nodes[idx].props.get(NAME).map(str::to_string))
            .collect()
    }

    /// Demangle every named node through `demangler`. Failures are logged and
    /// leave names untouched.
    pub fn demangle_names(&mut self, demangler: &dyn Demangler) {
        let names = self.named_nodes();
        if names.is_empty() {
            return;
        }
        match demangler.demangle(&names) {
            Ok(demangled) => self.apply_demangled(&demangled),
            Err(err) => warn!(error = %err, "demangling failed; keeping raw names"),
        }
    }

    fn named_node_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&idx| self.nodes[idx].props.get(NAME).is_some())
    }
}
