//! Vulnerable-version ranges and installed-version lookup.
//!
//! Ranges use the generic VERS body syntax: `|`-separated constraints such as
//! `>=1.2.0|<1.4.0`, a bare version for equality, or `*` for every version.

use std::fmt;
use std::path::{Path, PathBuf};

use semver::Version;
use serde_json::Value;
use thiserror::Error;

const VERS_PREFIX: &str = "vers:generic/";

/// Manifest keys that may carry the package version, in lookup order.
const VERSION_KEYS: [&str; 3] = ["version", "version-string", "version-semver"];

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Invalid version range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("Failed to read package manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse package manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a version as semver, padding a missing minor or patch with zeros.
pub fn parse_version(text: &str) -> Result<Version, VersionError> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let core_end = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(core_end);

    let mut padded = core.to_string();
    for _ in core.split('.').count()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    Version::parse(&padded)
        .map_err(|source| VersionError::InvalidVersion { version: text.to_string(), source })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    fn as_str(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    fn is_upper_bound(self) -> bool {
        matches!(self, Comparator::Lt | Comparator::Le)
    }

    fn is_lower_bound(self) -> bool {
        matches!(self, Comparator::Gt | Comparator::Ge)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub comparator: Comparator,
    pub version: Version,
}

impl Constraint {
    fn parse(text: &str, range: &str) -> Result<Self, VersionError> {
        // Two-character operators first so `>=` is not read as `>`.
        let operators = [
            (">=", Comparator::Ge),
            ("<=", Comparator::Le),
            ("!=", Comparator::Ne),
            (">", Comparator::Gt),
            ("<", Comparator::Lt),
            ("=", Comparator::Eq),
        ];
        let (comparator, rest) = operators
            .iter()
            .find_map(|(op, cmp)| text.strip_prefix(op).map(|rest| (*cmp, rest)))
            .unwrap_or((Comparator::Eq, text));

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(VersionError::InvalidRange {
                range: range.to_string(),
                reason: format!("constraint '{text}' has no version"),
            });
        }
        Ok(Self { comparator, version: parse_version(rest)? })
    }

    fn matches(&self, version: &Version) -> bool {
        match self.comparator {
            Comparator::Eq => version == &self.version,
            Comparator::Ne => version != &self.version,
            Comparator::Lt => version < &self.version,
            Comparator::Le => version <= &self.version,
            Comparator::Gt => version > &self.version,
            Comparator::Ge => version >= &self.version,
        }
    }
}

/// A parsed vulnerable-version range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersRange {
    Any,
    /// Constraints sorted by version.
    Constraints(Vec<Constraint>),
}

impl VersRange {
    /// Parse a range body, with or without the `vers:generic/` prefix.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let body = text.trim();
        let body = body.strip_prefix(VERS_PREFIX).unwrap_or(body).trim();
        if body == "*" {
            return Ok(VersRange::Any);
        }

        let mut constraints = Vec::new();
        for piece in body.split('|').map(str::trim) {
            if piece.is_empty() {
                return Err(VersionError::InvalidRange {
                    range: text.to_string(),
                    reason: "empty constraint".to_string(),
                });
            }
            constraints.push(Constraint::parse(piece, text)?);
        }
        constraints.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(VersRange::Constraints(constraints))
    }

    /// VERS containment: equality constraints decide first, then the
    /// remaining comparators are read as an ordered list of intervals.
    pub fn contains(&self, version: &Version) -> bool {
        let constraints = match self {
            VersRange::Any => return true,
            VersRange::Constraints(constraints) => constraints,
        };

        for constraint in constraints {
            match constraint.comparator {
                Comparator::Eq if &constraint.version == version => return true,
                Comparator::Ne if &constraint.version == version => return false,
                _ => {}
            }
        }

        let bounds: Vec<&Constraint> = constraints
            .iter()
            .filter(|c| !matches!(c.comparator, Comparator::Eq | Comparator::Ne))
            .collect();
        let (Some(first), Some(last)) = (bounds.first(), bounds.last()) else {
            return false;
        };

        if first.comparator.is_upper_bound() && first.matches(version) {
            return true;
        }
        if last.comparator.is_lower_bound() && last.matches(version) {
            return true;
        }
        bounds.windows(2).any(|pair| {
            pair[0].comparator.is_lower_bound()
                && pair[1].comparator.is_upper_bound()
                && pair[0].matches(version)
                && pair[1].matches(version)
        })
    }
}

impl fmt::Display for VersRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersRange::Any => f.write_str("*"),
            VersRange::Constraints(constraints) => {
                for (i, c) in constraints.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{}{}", c.comparator.as_str(), c.version)?;
                }
                Ok(())
            }
        }
    }
}

/// Whether `installed` falls inside the vulnerable `range`.
pub fn is_vulnerable(range: &str, installed: &str) -> Result<bool, VersionError> {
    Ok(VersRange::parse(range)?.contains(&parse_version(installed)?))
}

/// Installed version of a package and the manifest it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub version: String,
    pub manifest: PathBuf,
}

/// Manifest consulted for `package` under `src_dir`: the overlay port if it
/// exists, otherwise the root manifest.
pub fn manifest_path(src_dir: &Path, package: &str) -> PathBuf {
    let overlay = src_dir.join("vcpkg-overlays").join("ports").join(package).join("vcpkg.json");
    if overlay.is_file() {
        overlay
    } else {
        src_dir.join("vcpkg.json")
    }
}

/// Look up the installed version of `package` under `src_dir`.
///
/// Returns `Ok(None)` when the manifest names a different package or carries
/// no version.
pub fn resolve_package_version(
    src_dir: &Path,
    package: &str,
) -> Result<Option<PackageVersion>, VersionError> {
    let path = manifest_path(src_dir, package);
    let body = std::fs::read_to_string(&path)
        .map_err(|source| VersionError::ManifestRead { path: path.clone(), source })?;
    let manifest: Value = serde_json::from_str(&body)
        .map_err(|source| VersionError::ManifestParse { path: path.clone(), source })?;

    if manifest.get("name").and_then(Value::as_str) != Some(package) {
        return Ok(None);
    }
    let version = VERSION_KEYS.iter().find_map(|key| manifest.get(*key).and_then(Value::as_str));
    Ok(version.map(|version| PackageVersion { version: version.to_string(), manifest: path }))
}
