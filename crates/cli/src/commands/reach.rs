use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use reach_core::config::{load_reach_config, ReachConfig};
use reach_core::demangle::CxxFilt;
use reach_core::graph::FactGraph;
use reach_core::reach::{
    build_report, export_graph, load_vulnerabilities, write_report, ExternalReach, Orchestrator,
    Report,
};
use tracing::info;

use crate::canonicalize_or_current;

/// Inputs of one `reach` run. `None` / empty fields fall back to the config
/// file, then to [`ReachConfig`] defaults.
#[derive(Debug, Clone, Default)]
pub struct ReachOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub facts: PathBuf,
    pub reach: Option<PathBuf>,
    pub src: Option<PathBuf>,
    pub graph: Option<PathBuf>,
    pub entry: Option<String>,
    pub config: Option<PathBuf>,
    pub no_demangle: bool,
    pub args: Vec<String>,
}

impl ReachOptions {
    /// Effective configuration: flags over config file over defaults.
    pub fn resolve_config(&self) -> Result<ReachConfig> {
        let mut config = match &self.config {
            Some(path) => load_reach_config(path)?,
            None => ReachConfig::default(),
        };
        if let Some(reach) = &self.reach {
            config.reach_path = reach.clone();
        }
        if let Some(entry) = &self.entry {
            config.entrypoint = entry.clone();
        }
        if !self.args.is_empty() {
            config.reach_args = self.args.clone();
        }
        if self.no_demangle {
            config.demangle = false;
        }
        Ok(config)
    }
}

/// Classify every vulnerability in `options.input` and write the report.
pub fn reach_command(options: &ReachOptions) -> Result<Report> {
    let config = options.resolve_config()?;
    let facts_dir = canonicalize_or_current(&options.facts.to_string_lossy())?;

    let mut graph = FactGraph::load_dir(&facts_dir)
        .with_context(|| format!("Failed to load facts from {}", facts_dir.display()))?;
    if config.demangle {
        graph.demangle_names(&CxxFilt::new(config.demangler_path.clone()));
    }

    let sinks = load_vulnerabilities(&options.input)?;
    info!(sinks = sinks.len(), path = %options.input.display(), "loaded vulnerabilities");

    let mut orchestrator = Orchestrator::new(&graph, config.entrypoint.clone());
    if let Some(src) = &options.src {
        orchestrator = orchestrator.with_source_dir(src.clone());
    }
    let search = ExternalReach::from_config(&config, &facts_dir);
    let results = orchestrator.run(sinks, &search)?;

    let report = build_report(&results, &graph);
    write_report(&options.output, &report)?;
    if let Some(graph_dir) = &options.graph {
        export_graph(graph_dir, &results)
            .with_context(|| format!("Failed to export graph to {}", graph_dir.display()))?;
    }

    let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in &report.reachability_results {
        *tally.entry(entry.classification.as_str()).or_default() += 1;
    }
    println!("Reachability results ({}):", report.reachability_results.len());
    for (classification, count) in &tally {
        println!("  - {classification}: {count}");
    }
    println!("Report: {}", options.output.display());

    Ok(report)
}
