use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::facts::NodeId;
use crate::graph::FactGraph;
use crate::reach::version::{is_vulnerable, resolve_package_version};
use crate::reach::{
    Classification, PathSearch, ReachError, ReachPath, ReachResult, ReachabilityResult, Sink,
};

/// Classifies sinks against one fact graph.
///
/// Steps run strictly in order over the whole batch: resolve every sink,
/// filter by installed version, then one path search for the sinks still
/// pending.
#[derive(Debug)]
pub struct Orchestrator<'g> {
    graph: &'g FactGraph,
    entrypoint: String,
    src_dir: Option<PathBuf>,
}

impl<'g> Orchestrator<'g> {
    pub fn new(graph: &'g FactGraph, entrypoint: impl Into<String>) -> Self {
        Self { graph, entrypoint: entrypoint.into(), src_dir: None }
    }

    /// Enable version filtering against package manifests under `src_dir`.
    pub fn with_source_dir(mut self, src_dir: impl Into<PathBuf>) -> Self {
        self.src_dir = Some(src_dir.into());
        self
    }

    pub fn run(
        &self,
        sinks: Vec<Sink>,
        search: &dyn PathSearch,
    ) -> ReachResult<Vec<ReachabilityResult>> {
        let mut results: Vec<ReachabilityResult> =
            sinks.into_iter().map(ReachabilityResult::new).collect();

        self.resolve(&mut results);
        match self.src_dir.as_deref() {
            Some(src_dir) => filter_by_version(src_dir, &mut results),
            None => warn!("no source directory given; package versions will not be checked"),
        }
        self.search(&mut results, search)?;

        info!(sinks = results.len(), "classification finished");
        Ok(results)
    }

    fn resolve(&self, results: &mut [ReachabilityResult]) {
        for result in results.iter_mut() {
            match self.graph.find_function(&result.sink.affected_function) {
                Some(id) => {
                    debug!(function = %result.sink.affected_function, node = %id, "resolved sink");
                    result.function = Some(id.clone());
                }
                None => {
                    debug!(function = %result.sink.affected_function, "sink function not found");
                    result.settle(Classification::NotFound);
                }
            }
        }
    }

    fn search(
        &self,
        results: &mut [ReachabilityResult],
        search: &dyn PathSearch,
    ) -> ReachResult<()> {
        let mut seen = HashSet::new();
        let dsts: Vec<NodeId> = results
            .iter()
            .filter(|r| r.is_pending())
            .filter_map(|r| r.function.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if dsts.is_empty() {
            info!("no sinks left to search");
            return Ok(());
        }

        let src = self
            .graph
            .find_function(&self.entrypoint)
            .ok_or_else(|| ReachError::EntrypointNotFound(self.entrypoint.clone()))?;
        info!(entrypoint = %self.entrypoint, destinations = dsts.len(), "searching for paths");

        let found = search.find_paths(src, &dsts)?;
        for (dst, paths) in &found {
            for path in paths {
                self.check_path(dst, path)?;
            }
        }

        for result in results.iter_mut().filter(|r| r.is_pending()) {
            let Some(function) = result.function.as_ref() else {
                continue;
            };
            match found.get(function) {
                Some(paths) if paths.is_empty() => result.settle(Classification::NoPath),
                Some(paths) => {
                    result.paths = Some(paths.clone());
                    result.settle(Classification::Reachable);
                }
                None => {
                    warn!(cve = %result.sink.cve_id, node = %function, "no search result for sink")
                }
            }
        }
        Ok(())
    }

    fn check_path(&self, dst: &NodeId, path: &ReachPath) -> ReachResult<()> {
        if !path.is_well_formed() {
            return Err(ReachError::MalformedPath {
                dst: dst.clone(),
                nodes: path.nodes.len(),
                edges: path.edges.len(),
            });
        }
        match path.nodes.iter().find(|node| self.graph.node(node).is_none()) {
            Some(node) => Err(ReachError::UnknownPathNode { dst: dst.clone(), node: node.clone() }),
            None => Ok(()),
        }
    }
}

/// Mark pending sinks whose installed package version is outside their
/// vulnerable range. Lookup and parse failures only warn.
fn filter_by_version(src_dir: &Path, results: &mut [ReachabilityResult]) {
    for result in results.iter_mut().filter(|r| r.is_pending()) {
        let package = result.sink.package_name.clone();
        let installed = match resolve_package_version(src_dir, &package) {
            Ok(Some(installed)) => installed,
            Ok(None) => {
                warn!(
                    package = %package,
                    dir = %src_dir.display(),
                    "no manifest version for package"
                );
                continue;
            }
            Err(err) => {
                warn!(package = %package, error = %err, "package version lookup failed");
                continue;
            }
        };
        info!(
            package = %package,
            version = %installed.version,
            manifest = %installed.manifest.display(),
            "resolved package version"
        );
        result.sink.resolved_package_version = Some(installed.version.clone());

        let range = result.sink.vulnerable_version_range.clone();
        match is_vulnerable(&range, &installed.version) {
            Ok(true) => {
                debug!(package = %package, range = %range, "installed version is vulnerable")
            }
            Ok(false) => {
                info!(package = %package, range = %range, "installed version is not vulnerable");
                result.settle(Classification::NotVulnerable);
            }
            Err(err) => {
                warn!(package = %package, error = %err, "could not compare package version")
            }
        }
    }
}
