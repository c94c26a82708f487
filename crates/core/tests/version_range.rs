use std::fs;

use reach_core::reach::version::{
    is_vulnerable, manifest_path, parse_version, resolve_package_version,
};
use reach_core::reach::{VersRange, VersionError};
use tempfile::tempdir;

fn contains(range: &str, version: &str) -> bool {
    is_vulnerable(range, version).expect("valid range and version")
}

#[test]
fn short_versions_are_padded() {
    assert_eq!(parse_version("1").unwrap().to_string(), "1.0.0");
    assert_eq!(parse_version("v2.3").unwrap().to_string(), "2.3.0");
    assert_eq!(parse_version("1.2-rc1").unwrap().to_string(), "1.2.0-rc1");
    assert!(matches!(parse_version("one.two"), Err(VersionError::InvalidVersion { .. })));
}

#[test]
fn bounded_interval() {
    let range = ">=1.2.0|<1.4.0";
    assert!(!contains(range, "1.1.9"));
    assert!(contains(range, "1.2.0"));
    assert!(contains(range, "1.3.7"));
    assert!(!contains(range, "1.4.0"));
}

#[test]
fn open_ended_bounds() {
    assert!(contains("<2.0", "1.9.9"));
    assert!(!contains("<2.0", "2.0.0"));
    assert!(contains(">=3", "10.0.0"));
    assert!(!contains(">3", "3.0.0"));
}

#[test]
fn equality_and_exclusion() {
    assert!(contains("1.2.3", "1.2.3"));
    assert!(!contains("1.2.3", "1.2.4"));
    assert!(contains("=1.0|=1.5", "1.5.0"));
    assert!(!contains(">=1.0|!=1.2|<2.0", "1.2.0"));
    assert!(contains(">=1.0|!=1.2|<2.0", "1.3.0"));
}

#[test]
fn disjoint_intervals() {
    let range = "vers:generic/<1.0|>=2.0|<2.5|>=4.0";
    assert!(contains(range, "0.9.0"));
    assert!(!contains(range, "1.5.0"));
    assert!(contains(range, "2.1.0"));
    assert!(!contains(range, "3.0.0"));
    assert!(contains(range, "5.0.0"));
}

#[test]
fn star_matches_everything() {
    assert_eq!(VersRange::parse("*").unwrap(), VersRange::Any);
    assert_eq!(VersRange::parse("vers:generic/*").unwrap(), VersRange::Any);
    assert!(contains("*", "0.0.1"));
}

#[test]
fn constraints_are_sorted_for_display() {
    let range = VersRange::parse("<1.4.0|>=1.2").unwrap();
    assert_eq!(range.to_string(), ">=1.2.0|<1.4.0");
}

#[test]
fn malformed_ranges_are_rejected() {
    assert!(matches!(VersRange::parse(">=1.0||<2.0"), Err(VersionError::InvalidRange { .. })));
    assert!(matches!(VersRange::parse(">="), Err(VersionError::InvalidRange { .. })));
    assert!(matches!(VersRange::parse("<abc"), Err(VersionError::InvalidVersion { .. })));
}

#[test]
fn overlay_manifest_wins_over_root() {
    let src = tempdir().expect("tempdir");
    fs::write(src.path().join("vcpkg.json"), r#"{"name": "zlib", "version": "1.2.11"}"#).unwrap();
    assert_eq!(manifest_path(src.path(), "zlib"), src.path().join("vcpkg.json"));

    let overlay = src.path().join("vcpkg-overlays/ports/zlib");
    fs::create_dir_all(&overlay).unwrap();
    fs::write(overlay.join("vcpkg.json"), r#"{"name": "zlib", "version-string": "1.3"}"#).unwrap();

    let found = resolve_package_version(src.path(), "zlib").unwrap().expect("version");
    assert_eq!(found.version, "1.3");
    assert_eq!(found.manifest, overlay.join("vcpkg.json"));
}

#[test]
fn root_manifest_for_other_package_yields_none() {
    let src = tempdir().expect("tempdir");
    fs::write(src.path().join("vcpkg.json"), r#"{"name": "app", "version": "0.1.0"}"#).unwrap();
    assert_eq!(resolve_package_version(src.path(), "openssl").unwrap(), None);

    fs::write(src.path().join("vcpkg.json"), r#"{"name": "openssl"}"#).unwrap();
    assert_eq!(resolve_package_version(src.path(), "openssl").unwrap(), None);
}

#[test]
fn missing_or_broken_manifest_is_an_error() {
    let src = tempdir().expect("tempdir");
    let err = resolve_package_version(src.path(), "zlib").unwrap_err();
    assert!(matches!(err, VersionError::ManifestRead { .. }));

    fs::write(src.path().join("vcpkg.json"), "{not json").unwrap();
    let err = resolve_package_version(src.path(), "zlib").unwrap_err();
    assert!(matches!(err, VersionError::ManifestParse { .. }));
}
