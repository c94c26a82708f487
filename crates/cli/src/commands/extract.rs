use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use reach_core::facts::definitions::linkmap_definitions;
use reach_core::facts::{write_fact_dir, FactFiles};
use reach_core::linkmap::{LinkMapParser, ParseSummary};
use serde::{Deserialize, Serialize};

use crate::commands::util::{ensure_dir, resolve_context, write_json};
use crate::sha256_file;

pub const DEFINITIONS_FILE: &str = "definitions.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Provenance record written beside extracted facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractManifest {
    pub context: String,
    pub source_map: String,
    pub source_sha256: String,
    /// RFC 3339 generation time.
    pub generated_at: String,
    pub nodes: usize,
    pub edges: usize,
    pub summary: ParseSummary,
}

/// Parse a linker map and write its facts, schema definitions and manifest.
pub fn extract_command(
    map: &Path,
    out_dir: &Path,
    context: Option<String>,
) -> Result<ExtractManifest> {
    let context = resolve_context(context);
    let bytes =
        fs::read(map).with_context(|| format!("Failed to read linker map: {}", map.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    let (facts, summary) = LinkMapParser::new().parse(&text, &context);

    ensure_dir(out_dir)?;
    write_fact_dir(out_dir, &FactFiles::BASE, &facts)
        .with_context(|| format!("Failed to write facts to {}", out_dir.display()))?;
    write_json(&out_dir.join(DEFINITIONS_FILE), &linkmap_definitions(&context))?;

    let manifest = ExtractManifest {
        context,
        source_map: map.display().to_string(),
        source_sha256: sha256_file(map)?,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        nodes: facts.nodes.len(),
        edges: facts.edges.len(),
        summary,
    };
    write_json(&out_dir.join(MANIFEST_FILE), &manifest)?;

    println!("Extracted linker map facts:");
    println!("  Map: {}", manifest.source_map);
    println!("  Context: {}", manifest.context);
    println!("  Nodes: {}", manifest.nodes);
    println!("  Edges: {}", manifest.edges);
    println!("  Output: {}", out_dir.display());

    Ok(manifest)
}
