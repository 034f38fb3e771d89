use std::fs;
use std::path::Path;

use spirallogic::commands::has_spiral_extension;
use spirallogic::{canonicalize_or_current, infer_project_name, init_tracing, sha256_bytes};
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
fn canonicalize_or_current_resolves_existing_absolute_path() {
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");

    let result = canonicalize_or_current(subdir.to_str().unwrap()).expect("canonicalize nested");
    assert_eq!(result, subdir.canonicalize().expect("canonicalize subdir"));
}

#[test]
fn infer_project_name_uses_last_path_component() {
    assert_eq!(infer_project_name(Path::new("C:/work/spiral-rituals")), "spiral-rituals");
    assert_eq!(infer_project_name(Path::new("/tmp/project-root")), "project-root");
}

#[test]
fn infer_project_name_falls_back_when_missing() {
    assert_eq!(infer_project_name(Path::new("/")), "unnamed-project");
}

#[test]
fn sha256_bytes_matches_known_digest() {
    assert_eq!(
        sha256_bytes(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn spiral_extension_detection() {
    assert!(has_spiral_extension("rituals/hello.spiral"));
    assert!(has_spiral_extension("-"));
    assert!(!has_spiral_extension("notes.txt"));
    assert!(!has_spiral_extension("spiral"));
}

#[test]
fn init_tracing_reports_an_already_installed_subscriber() {
    assert!(init_tracing(false).is_ok());
    let err = init_tracing(true).unwrap_err();
    assert!(err.to_string().contains("Failed to install log subscriber"));
}
