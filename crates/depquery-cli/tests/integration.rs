//! Integration tests for the depquery CLI
//!
//! These run the binary against the graph and archive fixtures shared with
//! the query crate's tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Command for the depquery binary, isolated from the user's config files
#[allow(deprecated)]
fn depquery(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("depquery").expect("Failed to find depquery binary");
    cmd.env("HOME", home.path())
        .env_remove("DEPQUERY_CONFIG")
        .env_remove("DEPQUERY_REGISTRY")
        .current_dir(home.path());
    cmd
}

/// Path to depquery-query's fixtures
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("depquery-query/tests/fixtures")
        .join(name)
}

fn graph_arg() -> String {
    fixture_path("project.json").display().to_string()
}

fn archive_arg() -> String {
    fixture_path("archive.json").display().to_string()
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn node_names(json: &serde_json::Value) -> Vec<String> {
    let mut names: Vec<String> = json["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|node| node["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Query Command Tests
// ============================================================================

#[test]
fn test_query_text_output() {
    let home = TempDir::new().unwrap();
    depquery(&home)
        .args(["query", ":root > .prod", "--graph", &graph_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("a\t1.0.0"))
        .stdout(predicate::str::contains("e\t1.0.0"))
        .stdout(predicate::str::contains("b\t").not())
        .stderr(predicate::str::contains("2 packages"));
}

#[test]
fn test_query_json_output() {
    let home = TempDir::new().unwrap();
    let output = depquery(&home)
        .args(["query", ":root > *", "--graph", &graph_arg(), "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(node_names(&json), vec!["@x/y", "a", "b", "e"]);
    assert!(json["edges"]
        .as_array()
        .unwrap()
        .iter()
        .all(|edge| edge["from"] == "file·."));
}

#[test]
fn test_query_missing_edges_in_json() {
    let home = TempDir::new().unwrap();
    let output = depquery(&home)
        .args(["query", ":missing", "--graph", &graph_arg(), "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert!(json["nodes"].as_array().unwrap().is_empty());
    let edges = json["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["name"], "ghost");
    assert!(edges[0]["to"].is_null());
}

#[test]
fn test_query_with_archive() {
    let home = TempDir::new().unwrap();
    let output = depquery(&home)
        .args([
            "query",
            ":scripts",
            "--graph",
            &graph_arg(),
            "--archive",
            &archive_arg(),
            "-o",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(node_names(&stdout_json(&output)), vec!["a"]);
}

#[test]
fn test_query_without_archive_fails() {
    let home = TempDir::new().unwrap();
    depquery(&home)
        .args(["query", ":scripts", "--graph", &graph_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires a security archive"));
}

#[test]
fn test_unknown_pseudo_fails_unless_loose() {
    let home = TempDir::new().unwrap();
    depquery(&home)
        .args(["query", ":nope", "--graph", &graph_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported pseudo-class"));

    depquery(&home)
        .args(["query", ":nope", "--graph", &graph_arg(), "--loose"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No packages matched"));
}

#[test]
fn test_loose_from_local_config() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".depquery");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[query]\nloose = true\n").unwrap();

    depquery(&home)
        .args(["query", ":nope", "--graph", &graph_arg(), "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_missing_graph_file() {
    let home = TempDir::new().unwrap();
    depquery(&home)
        .args(["query", ":root", "--graph", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read graph document"));
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_show_applies_registry_flag() {
    let home = TempDir::new().unwrap();
    depquery(&home)
        .args(["--registry", "https://mirror.example/", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("url = \"https://mirror.example/\""));
}

#[test]
fn test_explicit_config_file_must_exist() {
    let home = TempDir::new().unwrap();
    depquery(&home)
        .args(["--config", "absent.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn test_invalid_registry_url_is_rejected() {
    let home = TempDir::new().unwrap();
    depquery(&home)
        .args(["--registry", "registry.example", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("registry.url"));
}
