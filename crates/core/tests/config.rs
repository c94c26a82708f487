use std::fs;
use std::path::PathBuf;

use reach_core::config::{load_reach_config, ReachConfig};
use tempfile::tempdir;

#[test]
fn yaml_overrides_only_given_fields() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("reach.yaml");
    fs::write(&path, "entrypoint: start\nreach_args: [\"--max-depth\", \"8\"]\ncache: true\n")
        .unwrap();

    let config = load_reach_config(&path).expect("load yaml");
    assert_eq!(config.entrypoint, "start");
    assert_eq!(config.reach_args, vec!["--max-depth", "8"]);
    assert!(config.cache);
    assert!(config.demangle);
    assert_eq!(config.demangler_path, PathBuf::from("c++filt"));
}

#[test]
fn json_is_chosen_by_extension() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("reach.json");
    fs::write(&path, r#"{"demangle": false, "work_dir": "/tmp/reach-work"}"#).unwrap();

    let config = load_reach_config(&path).expect("load json");
    assert!(!config.demangle);
    assert_eq!(config.work_dir, PathBuf::from("/tmp/reach-work"));
    assert_eq!(config.entrypoint, ReachConfig::default().entrypoint);
}

#[test]
fn unreadable_or_invalid_config_reports_context() {
    let dir = tempdir().expect("tempdir");
    let err = load_reach_config(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read reach config"));

    let path = dir.path().join("bad.json");
    fs::write(&path, "{").unwrap();
    let err = load_reach_config(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse reach config JSON"));
}
