use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming the default search tool binary.
pub const REACH_BIN_ENV: &str = "REACH_BIN";

/// Settings for one reachability run.
///
/// Loaded from YAML or JSON; every field is optional. CLI flags are applied
/// on top by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachConfig {
    /// Function every path search starts from.
    pub entrypoint: String,
    /// Search tool binary.
    pub reach_path: PathBuf,
    /// Extra arguments passed verbatim to the search tool.
    pub reach_args: Vec<String>,
    /// Value of the `cache` flag in the search request.
    pub cache: bool,
    pub demangle: bool,
    pub demangler_path: PathBuf,
    /// Directory for the search request/response files.
    pub work_dir: PathBuf,
}

impl Default for ReachConfig {
    fn default() -> Self {
        Self {
            entrypoint: "main".to_string(),
            reach_path: default_reach_path(),
            reach_args: Vec::new(),
            cache: false,
            demangle: true,
            demangler_path: PathBuf::from("c++filt"),
            work_dir: std::env::temp_dir(),
        }
    }
}

fn default_reach_path() -> PathBuf {
    std::env::var_os(REACH_BIN_ENV).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("reach"))
}

/// Load a config file (`.json` as JSON, anything else as YAML).
pub fn load_reach_config(path: &Path) -> Result<ReachConfig> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read reach config at {}", path.display()))?;
    let config = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_slice(&bytes).context("Failed to parse reach config JSON")?
    } else {
        serde_yaml::from_slice(&bytes).context("Failed to parse reach config YAML")?
    };
    Ok(config)
}
