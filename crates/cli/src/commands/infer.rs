use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use reach_core::facts::{read_fact_dir, write_fact_dir, FactFiles};
use reach_core::infer::{infer, linkmap_rules, rules_program};

use crate::commands::util::ensure_dir;

pub const RULES_FILE: &str = "rules.dl";

/// Run the inference rules over the base facts in `facts_dir` and write the
/// inferred tables to `out_dir` (default: `facts_dir`). Returns the number of
/// inferred edges.
pub fn infer_command(facts_dir: &Path, out_dir: Option<&Path>, emit_rules: bool) -> Result<usize> {
    let out_dir = out_dir.unwrap_or(facts_dir);
    let facts = read_fact_dir(facts_dir, &FactFiles::BASE)
        .with_context(|| format!("Failed to read facts from {}", facts_dir.display()))?;

    let rules = linkmap_rules();
    let inferred = infer(&facts, &rules);

    ensure_dir(out_dir)?;
    write_fact_dir(out_dir, &FactFiles::INFERRED, &inferred)
        .with_context(|| format!("Failed to write inferred facts to {}", out_dir.display()))?;

    println!("Inferred {} edges from {}", inferred.edges.len(), facts_dir.display());
    for rule in &rules {
        let count = inferred.edges_of_kind(&rule.edge_kind).count();
        println!("  - {} ({}): {}", rule.name, rule.edge_kind, count);
    }

    if emit_rules {
        let rules_path = out_dir.join(RULES_FILE);
        fs::write(&rules_path, rules_program(&rules))
            .with_context(|| format!("Failed to write rules to {}", rules_path.display()))?;
        println!("Wrote rule program: {}", rules_path.display());
    }

    Ok(inferred.edges.len())
}
