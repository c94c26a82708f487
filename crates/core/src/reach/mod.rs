//! Reachability classification of vulnerable functions over a fact graph.
//!
//! Each [`Sink`] starts out [`Classification::Unknown`] and moves forward
//! exactly once: resolution against `Function` nodes, then optional version
//! filtering, then a single batched path search for whatever is left.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facts::{FactError, NodeId};

pub mod orchestrator;
pub mod report;
pub mod search;
pub mod version;

pub use orchestrator::Orchestrator;
pub use report::{build_report, export_graph, write_report, Justification, Report, ReportEntry};
pub use search::{ExternalReach, PathSearch, ReachPath, SearchRequest, SearchResponse};
pub use version::{PackageVersion, VersRange, VersionError};

#[derive(Debug, Error)]
pub enum ReachError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Facts(#[from] FactError),

    #[error("Could not find entry point function '{0}'")]
    EntrypointNotFound(String),

    #[error("Failed to run search tool {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Search result for {dst} references unknown node {node}")]
    UnknownPathNode { dst: NodeId, node: NodeId },

    #[error("Search result for {dst} has {nodes} nodes but {edges} edges")]
    MalformedPath { dst: NodeId, nodes: usize, edges: usize },
}

pub type ReachResult<T> = Result<T, ReachError>;

/// A vulnerable function to classify, as read from a vulnerability descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sink {
    #[serde(rename = "cve-id")]
    pub cve_id: String,
    #[serde(rename = "cve-description", default)]
    pub description: String,
    #[serde(rename = "package-name", default)]
    pub package_name: String,
    /// Vulnerable version range, VERS generic syntax without the scheme prefix.
    #[serde(rename = "package-version", default)]
    pub vulnerable_version_range: String,
    /// Installed package version, filled in from package metadata if found.
    #[serde(skip)]
    pub resolved_package_version: Option<String>,
    #[serde(rename = "cwe-id", default)]
    pub cwe_id: String,
    #[serde(rename = "cwe-name", default)]
    pub cwe_name: String,
    #[serde(rename = "affected-function")]
    pub affected_function: String,
    #[serde(rename = "affected-file", default)]
    pub affected_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityFile {
    pub vulnerabilities: Vec<Sink>,
}

/// Read a vulnerability descriptor file.
pub fn load_vulnerabilities(path: &Path) -> ReachResult<Vec<Sink>> {
    let body = std::fs::read_to_string(path)
        .map_err(|source| ReachError::Io { path: path.to_path_buf(), source })?;
    let file: VulnerabilityFile = serde_json::from_str(&body)
        .map_err(|source| ReachError::Json { path: path.to_path_buf(), source })?;
    Ok(file.vulnerabilities)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Unknown,
    NotFound,
    NoPath,
    NotVulnerable,
    Reachable,
}

impl Classification {
    pub fn is_terminal(self) -> bool {
        self != Classification::Unknown
    }
}

/// Classification state for one sink.
#[derive(Debug, Clone)]
pub struct ReachabilityResult {
    pub sink: Sink,
    classification: Classification,
    /// `Function` node the sink's affected function resolved to.
    pub function: Option<NodeId>,
    /// Paths from the entry point, first one canonical. Set by the search step.
    pub paths: Option<Vec<ReachPath>>,
}

impl ReachabilityResult {
    pub fn new(sink: Sink) -> Self {
        Self { sink, classification: Classification::Unknown, function: None, paths: None }
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_pending(&self) -> bool {
        !self.classification.is_terminal()
    }

    /// Move to a terminal classification. Only the first transition sticks.
    pub fn settle(&mut self, next: Classification) {
        debug_assert!(next.is_terminal(), "cannot settle back to Unknown");
        if self.is_pending() {
            self.classification = next;
        }
    }

    /// The canonical (first) path, for `Reachable` results.
    pub fn canonical_path(&self) -> Option<&ReachPath> {
        self.paths.as_ref().and_then(|paths| paths.first())
    }
}
