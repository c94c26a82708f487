use std::env;
use std::fs;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

pub mod commands;

/// Environment variable holding the log filter (`tracing` directive syntax).
pub const LOG_ENV: &str = "LINKREACH_LOG";

/// Install the stderr log subscriber. `LINKREACH_LOG` wins when set;
/// otherwise `info`, or `debug` with `verbose`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second install (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

/// Make `path` absolute: canonicalized when it exists, otherwise joined onto
/// the current directory.
pub fn canonicalize_or_current(path: &str) -> Result<PathBuf> {
    let candidate = Path::new(path);
    if candidate == Path::new(".") {
        return env::current_dir().context("Failed to get current directory");
    }
    if let Ok(resolved) = candidate.canonicalize() {
        return Ok(resolved);
    }
    let cwd = env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(candidate))
}

/// Hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut BufReader::new(file), &mut hasher)
        .with_context(|| format!("Failed to read file for hashing: {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}
