//! Path search seam and the subprocess-backed implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ReachConfig;
use crate::facts::NodeId;
use crate::reach::{ReachError, ReachResult};

pub const REQUEST_FILE: &str = "reach_wrap_input.json";
pub const RESPONSE_FILE: &str = "reach_wrap_output.json";

/// Alternating node/edge walk: `nodes[i] --edges[i]--> nodes[i + 1]`.
///
/// Edges are labelled by kind only (`Calls`, `Succ`, ...), as the search tool
/// reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachPath {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<String>,
}

impl ReachPath {
    pub fn new(nodes: Vec<NodeId>, edges: Vec<String>) -> Self {
        Self { nodes, edges }
    }

    /// A path is well formed when it has at least one node and one edge
    /// fewer than nodes.
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty() && self.edges.len() + 1 == self.nodes.len()
    }

    /// `(source, edge kind, destination)` for every hop.
    pub fn steps(&self) -> impl Iterator<Item = (&NodeId, &str, &NodeId)> {
        self.nodes
            .windows(2)
            .zip(&self.edges)
            .map(|(pair, edge)| (&pair[0], edge.as_str(), &pair[1]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub src: NodeId,
    pub dst: NodeId,
}

/// Request document handed to the search tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub cache: bool,
    pub queries: Vec<Query>,
}

impl SearchRequest {
    pub fn new(cache: bool, src: &NodeId, dsts: &[NodeId]) -> Self {
        let queries = dsts.iter().map(|dst| Query { src: src.clone(), dst: dst.clone() }).collect();
        Self { cache, queries }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub dst: NodeId,
    #[serde(default)]
    pub paths: Vec<ReachPath>,
}

/// Response document written by the search tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query_results: Vec<QueryResult>,
}

impl SearchResponse {
    /// Paths keyed by destination. A destination listed twice keeps its
    /// last entry.
    pub fn into_map(self) -> HashMap<NodeId, Vec<ReachPath>> {
        self.query_results.into_iter().map(|result| (result.dst, result.paths)).collect()
    }
}

/// Finds control-flow paths from one source node to many destinations.
///
/// Destinations absent from the returned map had no answer; an empty list
/// means the search ran and found nothing.
pub trait PathSearch {
    fn find_paths(
        &self,
        src: &NodeId,
        dsts: &[NodeId],
    ) -> ReachResult<HashMap<NodeId, Vec<ReachPath>>>;
}

/// Runs the external `reach` tool over a facts directory.
///
/// Invocation: `<program> -f <facts_dir> -i <request> -o <response> <args...>`,
/// with the request and response files under `work_dir`.
#[derive(Debug, Clone)]
pub struct ExternalReach {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub facts_dir: PathBuf,
    pub work_dir: PathBuf,
    pub cache: bool,
}

impl ExternalReach {
    pub fn from_config(config: &ReachConfig, facts_dir: &Path) -> Self {
        Self {
            program: config.reach_path.clone(),
            args: config.reach_args.clone(),
            facts_dir: facts_dir.to_path_buf(),
            work_dir: config.work_dir.clone(),
            cache: config.cache,
        }
    }

    pub fn request_path(&self) -> PathBuf {
        self.work_dir.join(REQUEST_FILE)
    }

    pub fn response_path(&self) -> PathBuf {
        self.work_dir.join(RESPONSE_FILE)
    }

    fn write_request(&self, request: &SearchRequest) -> ReachResult<PathBuf> {
        std::fs::create_dir_all(&self.work_dir)
            .map_err(|source| ReachError::Io { path: self.work_dir.clone(), source })?;
        let path = self.request_path();
        let body = serde_json::to_string_pretty(request)
            .map_err(|source| ReachError::Json { path: path.clone(), source })?;
        std::fs::write(&path, body)
            .map_err(|source| ReachError::Io { path: path.clone(), source })?;
        debug!(path = %path.display(), queries = request.queries.len(), "wrote search request");
        Ok(path)
    }

    fn invoke(&self, request_path: &Path, response_path: &Path) -> ReachResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-f")
            .arg(&self.facts_dir)
            .arg("-i")
            .arg(request_path)
            .arg("-o")
            .arg(response_path)
            .args(&self.args);
        info!(program = %self.program.display(), "invoking search tool");

        let output = cmd
            .output()
            .map_err(|source| ReachError::Spawn { program: self.program.clone(), source })?;
        if output.status.success() {
            info!(path = %response_path.display(), "search tool wrote response");
        } else {
            warn!(
                status = %output.status,
                stdout = %String::from_utf8_lossy(&output.stdout),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "search tool exited unsuccessfully"
            );
        }
        Ok(())
    }

    fn read_response(&self, path: &Path) -> ReachResult<SearchResponse> {
        let body = std::fs::read_to_string(path)
            .map_err(|source| ReachError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&body)
            .map_err(|source| ReachError::Json { path: path.to_path_buf(), source })
    }
}

impl PathSearch for ExternalReach {
    fn find_paths(
        &self,
        src: &NodeId,
        dsts: &[NodeId],
    ) -> ReachResult<HashMap<NodeId, Vec<ReachPath>>> {
        let request_path = self.write_request(&SearchRequest::new(self.cache, src, dsts))?;
        let response_path = self.response_path();
        // A response left over from an earlier run must not be read as this one's.
        if response_path.exists() {
            std::fs::remove_file(&response_path)
                .map_err(|source| ReachError::Io { path: response_path.clone(), source })?;
        }
        self.invoke(&request_path, &response_path)?;
        Ok(self.read_response(&response_path)?.into_map())
    }
}
