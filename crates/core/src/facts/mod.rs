//! Fact schema shared by every producer and consumer of fact graphs.
//!
//! A fact set is four parallel tables:
//! - `nodes`: `id, kind`
//! - `nodeprops`: `id, key, value`
//! - `edges`: `id, kind, src, dst`
//! - `edgeprops`: `id, key, value`
//!
//! Property values are always text, even for addresses and sizes, so the
//! radix and formatting of the source material survive unchanged.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod definitions;
pub mod io;
pub mod store;

pub use io::{read_fact_dir, read_fact_dir_with_inferred, write_fact_dir, FactFiles};
pub use store::{FactStore, PropertyTarget};

/// Error type for fact-file I/O and fact-set integrity checks.
#[derive(Debug, Error)]
pub enum FactError {
    #[error("Failed to access fact file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: expected {expected} fields, found {found}")]
    Malformed { path: PathBuf, line: usize, expected: usize, found: usize },

    #[error("Property '{key}' references unknown id {id}")]
    DanglingProperty { id: String, key: String },

    #[error("Edge {edge} references unknown node {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },
}

/// Convenience result type for fact operations.
pub type FactResult<T> = Result<T, FactError>;

/// Opaque node identifier (e.g. `linkmap:node_5`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

/// Opaque edge identifier (e.g. `linkmap:edge_5`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a node. Kinds produced elsewhere (e.g. compiler facts) that this
/// crate has no special handling for are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Section,
    ObjectFile,
    Symbol,
    Load,
    MemoryRegion,
    MergeEvent,
    ArchiveEvent,
    DiscardedSection,
    Function,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Section => "section",
            NodeKind::ObjectFile => "objectFile",
            NodeKind::Symbol => "symbol",
            NodeKind::Load => "load",
            NodeKind::MemoryRegion => "memoryRegion",
            NodeKind::MergeEvent => "mergeEvent",
            NodeKind::ArchiveEvent => "archiveEvent",
            NodeKind::DiscardedSection => "discardedSection",
            NodeKind::Function => "Function",
            NodeKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for NodeKind {
    fn from(value: &str) -> Self {
        match value {
            "section" => NodeKind::Section,
            "objectFile" => NodeKind::ObjectFile,
            "symbol" => NodeKind::Symbol,
            "load" => NodeKind::Load,
            "memoryRegion" => NodeKind::MemoryRegion,
            "mergeEvent" => NodeKind::MergeEvent,
            "archiveEvent" => NodeKind::ArchiveEvent,
            "discardedSection" => NodeKind::DiscardedSection,
            "Function" => NodeKind::Function,
            other => NodeKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    Contains,
    Defines,
    Merged,
    ArchiveRef,
    Load2ObjectFile,
    MemRegion2DiscardedSection,
    MemRegion2Section,
    ReachablePath,
    Other(String),
}

impl EdgeKind {
    pub fn as_str(&self) -> &str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Defines => "defines",
            EdgeKind::Merged => "merged",
            EdgeKind::ArchiveRef => "archiveRef",
            EdgeKind::Load2ObjectFile => "load2objectFile",
            EdgeKind::MemRegion2DiscardedSection => "memRegion2discardedSection",
            EdgeKind::MemRegion2Section => "memRegion2section",
            EdgeKind::ReachablePath => "ReachablePath",
            EdgeKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for EdgeKind {
    fn from(value: &str) -> Self {
        match value {
            "contains" => EdgeKind::Contains,
            "defines" => EdgeKind::Defines,
            "merged" => EdgeKind::Merged,
            "archiveRef" => EdgeKind::ArchiveRef,
            "load2objectFile" => EdgeKind::Load2ObjectFile,
            "memRegion2discardedSection" => EdgeKind::MemRegion2DiscardedSection,
            "memRegion2section" => EdgeKind::MemRegion2Section,
            "ReachablePath" => EdgeKind::ReachablePath,
            other => EdgeKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the `nodes` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// One row of the `edges` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub src: NodeId,
    pub dst: NodeId,
}

/// One row of a property table, keyed by a node or edge id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropRecord<I> {
    pub id: I,
    pub key: String,
    pub value: String,
}

impl<I> PropRecord<I> {
    pub fn new(id: I, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { id, key: key.into(), value: value.into() }
    }
}

/// The four fact tables, in the order records were produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactSet {
    pub nodes: Vec<NodeRecord>,
    pub node_props: Vec<PropRecord<NodeId>>,
    pub edges: Vec<EdgeRecord>,
    pub edge_props: Vec<PropRecord<EdgeId>>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.node_props.is_empty()
            && self.edges.is_empty()
            && self.edge_props.is_empty()
    }

    /// Append every record of `other` after this set's records.
    pub fn union(&mut self, other: FactSet) {
        self.nodes.extend(other.nodes);
        self.node_props.extend(other.node_props);
        self.edges.extend(other.edges);
        self.edge_props.extend(other.edge_props);
    }

    /// All values recorded for `key` on node `id`, in record order.
    pub fn node_property_values<'a>(
        &'a self,
        id: &'a NodeId,
        key: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.node_props
            .iter()
            .filter(move |p| &p.id == id && p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Nodes of the given kind, in record order.
    pub fn nodes_of_kind<'a>(&'a self, kind: &'a NodeKind) -> impl Iterator<Item = &'a NodeRecord> {
        self.nodes.iter().filter(move |n| &n.kind == kind)
    }

    /// Edges of the given kind, in record order.
    pub fn edges_of_kind<'a>(&'a self, kind: &'a EdgeKind) -> impl Iterator<Item = &'a EdgeRecord> {
        self.edges.iter().filter(move |e| &e.kind == kind)
    }
}
