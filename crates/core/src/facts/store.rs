use std::collections::{HashMap, HashSet};

use crate::facts::{EdgeId, EdgeKind, EdgeRecord, FactSet, NodeId, NodeKind, NodeRecord, PropRecord};

/// Natural-key lookup tables, one per node kind that is deduplicated.
///
/// Scoped to a single graph-building session; nothing here is shared between
/// stores, so independent sessions never observe each other's keys.
#[derive(Debug, Default)]
struct KeyTables {
    tables: HashMap<NodeKind, HashMap<String, NodeId>>,
}

impl KeyTables {
    fn get(&self, kind: &NodeKind, key: &str) -> Option<&NodeId> {
        self.tables.get(kind).and_then(|table| table.get(key))
    }

    fn insert(&mut self, kind: NodeKind, key: String, id: NodeId) {
        self.tables.entry(kind).or_default().insert(key, id);
    }
}

/// Append-only sink for nodes, edges and properties during graph construction.
///
/// Node and edge ids come from monotonically increasing counters and are never
/// reused. Nodes created through [`FactStore::get_or_create_node`] are
/// deduplicated by natural key; edges never are.
#[derive(Debug)]
pub struct FactStore {
    context: String,
    next_node: u64,
    next_edge: u64,
    keys: KeyTables,
    known_nodes: HashSet<NodeId>,
    known_edges: HashSet<EdgeId>,
    facts: FactSet,
}

impl FactStore {
    /// Create an empty store whose ids are prefixed with `context`
    /// (`<context>:node_<n>` / `<context>:edge_<n>`).
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            next_node: 1,
            next_edge: 1,
            keys: KeyTables::default(),
            known_nodes: HashSet::new(),
            known_edges: HashSet::new(),
            facts: FactSet::new(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Return the node registered under `natural_key` for `kind`, creating it
    /// with `props` on first sight. Later calls ignore their `props`.
    pub fn get_or_create_node(
        &mut self,
        kind: NodeKind,
        natural_key: &str,
        props: &[(&str, &str)],
    ) -> NodeId {
        if let Some(existing) = self.keys.get(&kind, natural_key) {
            return existing.clone();
        }
        let id = self.create_node(kind.clone(), props);
        self.keys.insert(kind, natural_key.to_string(), id.clone());
        id
    }

    /// Create a node that is not deduplicated (events, discarded sections).
    pub fn create_node(&mut self, kind: NodeKind, props: &[(&str, &str)]) -> NodeId {
        let id = NodeId(format!("{}:node_{}", self.context, self.next_node));
        self.next_node += 1;
        self.facts.nodes.push(NodeRecord { id: id.clone(), kind });
        self.known_nodes.insert(id.clone());
        for (key, value) in props {
            self.set_property(&id, key, value);
        }
        id
    }

    /// Look up a deduplicated node without creating it.
    pub fn lookup(&self, kind: &NodeKind, natural_key: &str) -> Option<&NodeId> {
        self.keys.get(kind, natural_key)
    }

    /// Create an edge with a fresh id. The same `(src, dst, kind)` may repeat.
    pub fn create_edge(
        &mut self,
        kind: EdgeKind,
        src: &NodeId,
        dst: &NodeId,
        props: &[(&str, &str)],
    ) -> EdgeId {
        debug_assert!(self.known_nodes.contains(src), "edge source {src} was not created here");
        debug_assert!(self.known_nodes.contains(dst), "edge target {dst} was not created here");

        let id = EdgeId(format!("{}:edge_{}", self.context, self.next_edge));
        self.next_edge += 1;
        self.facts.edges.push(EdgeRecord {
            id: id.clone(),
            kind,
            src: src.clone(),
            dst: dst.clone(),
        });
        self.known_edges.insert(id.clone());
        for (key, value) in props {
            self.set_property(&id, key, value);
        }
        id
    }

    /// Append a property record. Keys are not checked for uniqueness.
    pub fn set_property<T: PropertyTarget>(&mut self, target: &T, key: &str, value: &str) {
        debug_assert!(
            target.is_known(self),
            "property '{key}' set on an id this store never issued"
        );
        target.push_property(&mut self.facts, key, value);
    }

    pub fn node_count(&self) -> usize {
        self.facts.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.facts.edges.len()
    }

    pub fn facts(&self) -> &FactSet {
        &self.facts
    }

    /// Finish the session, dropping the natural-key tables.
    pub fn into_facts(self) -> FactSet {
        self.facts
    }
}

/// Something a property can be attached to: a node id or an edge id.
pub trait PropertyTarget {
    fn push_property(&self, facts: &mut FactSet, key: &str, value: &str);
    fn is_known(&self, store: &FactStore) -> bool;
}

impl PropertyTarget for NodeId {
    fn push_property(&self, facts: &mut FactSet, key: &str, value: &str) {
        facts.node_props.push(PropRecord::new(self.clone(), key, value));
    }

    fn is_known(&self, store: &FactStore) -> bool {
        store.known_nodes.contains(self)
    }
}

impl PropertyTarget for EdgeId {
    fn push_property(&self, facts: &mut FactSet, key: &str, value: &str) {
        facts.edge_props.push(PropRecord::new(self.clone(), key, value));
    }

    fn is_known(&self, store: &FactStore) -> bool {
        store.known_edges.contains(self)
    }
}
