//! Report rendering and reachable-path graph export.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::facts::{
    write_fact_dir, EdgeId, EdgeKind, EdgeRecord, FactFiles, FactResult, FactSet, PropRecord,
};
use crate::graph::FactGraph;
use crate::reach::{Classification, ReachError, ReachPath, ReachResult, ReachabilityResult};

/// Edge kinds that are structural rather than calls; left out of call paths.
pub const NON_CALL_EDGES: [&str; 2] = ["Succ", "Contains"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Justification {
    pub conclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_path: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_flow_path: Option<Vec<String>>,
}

impl Justification {
    fn new(conclusion: &str, reason: &str) -> Self {
        Self {
            conclusion: conclusion.to_string(),
            reason: Some(reason.to_string()),
            call_path: None,
            control_flow_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub cve_id: String,
    pub classification: String,
    pub justification: Justification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub reachability_results: Vec<ReportEntry>,
}

/// Render a path hop by hop: `[name0, "Edge -> name1", ...]`. With
/// `calls_only`, hops over non-call edges are dropped.
fn render_path(path: &ReachPath, graph: &FactGraph, calls_only: bool) -> Vec<String> {
    let Some(first) = path.nodes.first() else {
        return Vec::new();
    };
    let mut rendered = vec![graph.display_name(first).to_string()];
    for (_, edge, dst) in path.steps() {
        if calls_only && NON_CALL_EDGES.contains(&edge) {
            continue;
        }
        rendered.push(format!("{edge} -> {}", graph.display_name(dst)));
    }
    rendered
}

pub fn control_flow_path(path: &ReachPath, graph: &FactGraph) -> Vec<String> {
    render_path(path, graph, false)
}

pub fn call_path(path: &ReachPath, graph: &FactGraph) -> Vec<String> {
    render_path(path, graph, true)
}

pub fn report_entry(result: &ReachabilityResult, graph: &FactGraph) -> ReportEntry {
    let (classification, justification) = match (result.classification(), result.canonical_path()) {
        (Classification::NotFound, _) => (
            "unreachable",
            Justification::new(
                "Not Found",
                "The affected function was not found in compiled program metadata.",
            ),
        ),
        (Classification::NoPath, _) => (
            "unreachable",
            Justification::new(
                "Not Reachable",
                "Control Flow Graph analysis found no paths to target function.",
            ),
        ),
        (Classification::NotVulnerable, _) => (
            "unreachable",
            Justification::new(
                "Not Vulnerable",
                "The package version is not considered vulnerable according to the supplied \
                 version information. It may or may not still be reachable.",
            ),
        ),
        (Classification::Reachable, Some(path)) => (
            "potentially reachable",
            Justification {
                call_path: Some(call_path(path, graph)),
                control_flow_path: Some(control_flow_path(path, graph)),
                ..Justification::new(
                    "Statically Reachable",
                    "Control Flow Graph analysis found the following candidate path...",
                )
            },
        ),
        (other, _) => {
            warn!(cve = %result.sink.cve_id, classification = ?other, "sink left unclassified");
            (
                "Unable to assess",
                Justification {
                    conclusion: "Error: internal tool failure".to_string(),
                    reason: None,
                    call_path: None,
                    control_flow_path: None,
                },
            )
        }
    };
    ReportEntry {
        cve_id: result.sink.cve_id.clone(),
        classification: classification.to_string(),
        justification,
    }
}

/// One entry per result, in input order.
pub fn build_report(results: &[ReachabilityResult], graph: &FactGraph) -> Report {
    Report { reachability_results: results.iter().map(|r| report_entry(r, graph)).collect() }
}

pub fn write_report(path: &Path, report: &Report) -> ReachResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|source| ReachError::Io { path: parent.to_path_buf(), source })?;
    }
    let body = serde_json::to_string_pretty(report)
        .map_err(|source| ReachError::Json { path: path.to_path_buf(), source })?;
    std::fs::write(path, body)
        .map_err(|source| ReachError::Io { path: path.to_path_buf(), source })?;
    info!(path = %path.display(), entries = report.reachability_results.len(), "wrote report");
    Ok(())
}

/// Facts describing the outcome: `vulnerability_id` and `reachable` on every
/// resolved sink function, and a `ReachablePath` edge (with a `kind`
/// property) for each hop of each retained path.
///
/// The result carries no node records: it is an overlay whose ids all come
/// from the analysed graph, and only loads once unioned with those base facts.
pub fn reachability_facts(results: &[ReachabilityResult]) -> FactSet {
    let mut facts = FactSet::new();
    for result in results {
        let Some(function) = result.function.as_ref() else {
            continue;
        };
        if result.classification() == Classification::NotFound {
            continue;
        }
        let reachable = result.classification() == Classification::Reachable;
        facts.node_props.push(PropRecord::new(
            function.clone(),
            "vulnerability_id",
            &result.sink.cve_id,
        ));
        facts.node_props.push(PropRecord::new(
            function.clone(),
            "reachable",
            reachable.to_string(),
        ));
    }

    let reachable = results.iter().filter(|r| r.classification() == Classification::Reachable);
    let hops = reachable.flat_map(|r| r.paths.iter().flatten()).flat_map(ReachPath::steps);
    for (i, (src, edge, dst)) in hops.enumerate() {
        let id = EdgeId(format!("reachable_path_{i}"));
        facts.edges.push(EdgeRecord {
            id: id.clone(),
            kind: EdgeKind::ReachablePath,
            src: src.clone(),
            dst: dst.clone(),
        });
        facts.edge_props.push(PropRecord::new(id, "kind", edge));
    }
    facts
}

/// Write [`reachability_facts`] to `dir` using the base file names.
///
/// `nodes.facts` is written empty, so the directory is not loadable on its own;
/// union it with the facts the analysis ran on.
pub fn export_graph(dir: &Path, results: &[ReachabilityResult]) -> FactResult<()> {
    let facts = reachability_facts(results);
    write_fact_dir(dir, &FactFiles::BASE, &facts)?;
    info!(dir = %dir.display(), edges = facts.edges.len(), "exported reachable paths");
    Ok(())
}
