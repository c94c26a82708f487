use std::fs;

use linkreach::commands::{resolve_context, GLOBAL_CONTEXT_ENV};
use linkreach::{canonicalize_or_current, sha256_file};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_returns_cwd_for_dot() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let result = canonicalize_or_current(".").expect("canonicalize").canonicalize().expect("canon");
    let expected = tmp.path().canonicalize().expect("canon tmp");
    assert_eq!(result, expected);

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn canonicalize_or_current_joins_missing_paths_onto_cwd() {
    let result = canonicalize_or_current("definitely/not/here").expect("resolve");
    assert!(result.is_absolute());
    assert!(result.ends_with("definitely/not/here"));
}

#[test]
fn sha256_file_matches_known_digest() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("abc.txt");
    fs::write(&path, "abc").expect("write");
    assert_eq!(
        sha256_file(&path).expect("hash"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );

    let err = sha256_file(&tmp.path().join("missing")).unwrap_err();
    assert!(err.to_string().contains("Failed to open file for hashing"));
}

#[test]
fn context_prefers_flag_then_environment() {
    assert_eq!(resolve_context(Some("custom".to_string())), "custom");

    std::env::set_var(GLOBAL_CONTEXT_ENV, "build42:");
    assert_eq!(resolve_context(None), "build42:linkmap");
    std::env::remove_var(GLOBAL_CONTEXT_ENV);
    assert_eq!(resolve_context(None), "linkmap");
}
