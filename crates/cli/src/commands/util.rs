use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Environment variable whose value is prepended to `linkmap` to form the
/// default fact-id context.
pub const GLOBAL_CONTEXT_ENV: &str = "GlobalContext";

/// Fact-id context: the explicit flag, else `$GlobalContext` + `linkmap`.
pub fn resolve_context(flag: Option<String>) -> String {
    flag.unwrap_or_else(|| {
        let prefix = std::env::var(GLOBAL_CONTEXT_ENV).unwrap_or_default();
        format!("{prefix}linkmap")
    })
}

/// Pretty-print `value` as JSON into `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Create `dir` (and parents) with a path-naming error.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}
