use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use reach_core::graph::FactGraph;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FactsInfo {
    pub facts_dir: String,
    pub nodes: usize,
    pub edges: usize,
    pub node_kinds: BTreeMap<String, usize>,
    pub edge_kinds: BTreeMap<String, usize>,
}

/// Load a facts directory (base plus inferred) and summarize it.
pub fn facts_info(facts_dir: &Path) -> Result<FactsInfo> {
    let graph = FactGraph::load_dir(facts_dir)
        .with_context(|| format!("Failed to load facts from {}", facts_dir.display()))?;
    Ok(FactsInfo {
        facts_dir: facts_dir.display().to_string(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        node_kinds: graph.node_kind_counts(),
        edge_kinds: graph.edge_kind_counts(),
    })
}

pub fn facts_info_command(facts_dir: &Path, json: bool) -> Result<()> {
    let info = facts_info(facts_dir)?;

    if json {
        let serialized =
            serde_json::to_string_pretty(&info).context("Failed to serialize facts info to JSON")?;
        println!("{serialized}");
        return Ok(());
    }

    println!("Facts: {}", info.facts_dir);
    println!("Nodes ({}):", info.nodes);
    for (kind, count) in &info.node_kinds {
        println!("  - {kind}: {count}");
    }
    println!("Edges ({}):", info.edges);
    for (kind, count) in &info.edge_kinds {
        println!("  - {kind}: {count}");
    }
    Ok(())
}
