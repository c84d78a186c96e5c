mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use common::{caplook_binary, standard_rows, write_capability_workbook, write_config};
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let books = root.join("workbooks");
    fs::create_dir_all(&books).unwrap();
    write_capability_workbook(&books.join("phoenix.xlsx"), standard_rows());
    write_capability_workbook(
        &books.join("atlas.xlsx"),
        vec![
            vec!["Capabilities", "Business Description", "System Modifications"],
            vec![
                "Ledger Posting",
                "Post journals to the general ledger nightly",
                "New batch job",
            ],
        ],
    );
    // Excel lock file, never picked up
    fs::write(books.join("~$phoenix.xlsx"), b"lock").unwrap();

    let config_path = write_config(&root, &books);
    (tmp, config_path)
}

fn run_caplook(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = caplook_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run caplook binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_json(config_path: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--format", "json"];
    full.extend_from_slice(args);
    let (stdout, stderr, success) = run_caplook(config_path, &full);
    assert!(success, "caplook {:?} failed: {}", args, stderr);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON from {:?}: {}\n{}", args, e, stdout))
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_caplook(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully"));
    assert!(tmp.path().join("data").join("caplook.sqlite").exists());

    // idempotent
    let (_, stderr, success) = run_caplook(&config, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_validate_reports_each_workbook() {
    let (_tmp, config) = setup_test_env();
    let report = run_json(&config, &["validate"]);
    assert_eq!(report["total_files"], 2);
    assert_eq!(report["valid_files"], 2);
    assert_eq!(report["files"][0]["file_name"], "atlas.xlsx");
    assert_eq!(report["files"][1]["header_row"], 1);
    assert_eq!(report["files"][1]["data_rows"], 2);

    let (stdout, _, success) = run_caplook(&config, &["validate"]);
    assert!(success);
    assert!(stdout.contains("WORKBOOK VALIDATION"));
    assert!(stdout.contains("✓ phoenix.xlsx"));
}

#[test]
fn test_validate_missing_directory_is_reported() {
    let (tmp, config) = setup_test_env();
    let missing = tmp.path().join("nowhere");
    let report = run_json(&config, &["validate", "--dir", missing.to_str().unwrap()]);
    assert_eq!(report["total_files"], 0);
    assert!(report["error"].as_str().unwrap().contains("does not exist"));
}

#[test]
fn test_index_missing_directory_is_reported() {
    let (tmp, config) = setup_test_env();
    let missing = tmp.path().join("nowhere");
    let report = run_json(&config, &["index", "--dir", missing.to_str().unwrap()]);
    assert_eq!(report["files_found"], 0);
    assert!(report["error"].as_str().unwrap().contains("does not exist"));
}

#[test]
fn test_index_stats_files_search() {
    let (_tmp, config) = setup_test_env();

    let report = run_json(&config, &["index"]);
    assert_eq!(report["files_found"], 2);
    assert_eq!(report["files_succeeded"], 2);
    assert_eq!(report["total_chunks"], 3);

    // re-index replaces instead of appending
    let report = run_json(&config, &["index"]);
    assert_eq!(report["total_chunks"], 3);

    let stats = run_json(&config, &["stats"]);
    assert_eq!(stats["collection"], "capability_chunks");
    assert_eq!(stats["total_chunks"], 3);
    assert_eq!(stats["source_files"], 2);
    assert_eq!(stats["embedding_models"][0], "hash");

    let files = run_json(&config, &["files"]);
    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["file_name"], "atlas.xlsx");
    assert_eq!(files[0]["chunks"], 1);
    assert_eq!(files[1]["chunks"], 2);

    let result = run_json(&config, &["search", "general", "ledger", "journals"]);
    assert_eq!(result["query"], "general ledger journals");
    assert_eq!(result["total_found"], 3);
    assert_eq!(result["matches"][0]["capability"], "Ledger Posting");
    assert_eq!(result["matches"][0]["rank"], 1);
    let link = result["matches"][0]["source_link"].as_str().unwrap();
    assert!(link.starts_with("file://"));
    assert!(link.ends_with("atlas.xlsx#sheet=Capability List&row=1"));
    assert!(result["overview"]
        .as_str()
        .unwrap()
        .starts_with("Analysis failed."));

    let result = run_json(&config, &["search", "ledger", "--limit", "1"]);
    assert_eq!(result["total_found"], 1);

    let (stdout, _, success) = run_caplook(&config, &["search", "consent"]);
    assert!(success);
    assert!(stdout.contains("CAPABILITY SEARCH RESULTS"));
    assert!(stdout.contains("SOURCE FILES"));
    assert!(stdout.contains("(Similarity: "));
}

#[test]
fn test_dry_run_leaves_store_empty() {
    let (_tmp, config) = setup_test_env();
    let report = run_json(&config, &["index", "--dry-run"]);
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["total_chunks"], 3);

    let stats = run_json(&config, &["stats"]);
    assert_eq!(stats["total_chunks"], 0);

    let (stdout, _, success) = run_caplook(&config, &["files"]);
    assert!(success);
    assert_eq!(stdout, "No files indexed.\n");
}

#[test]
fn test_search_empty_store() {
    let (_tmp, config) = setup_test_env();
    let result = run_json(&config, &["search", "anything"]);
    assert_eq!(result["total_found"], 0);
    assert_eq!(
        result["overview"],
        "No matching capabilities found for the given query."
    );
    assert!(result.get("error").is_none());
}

#[test]
fn test_search_requires_query() {
    let (_tmp, config) = setup_test_env();
    let (_, _, success) = run_caplook(&config, &["search"]);
    assert!(!success);
    let (_, _, success) = run_caplook(&config, &["search", "x", "--limit", "0"]);
    assert!(!success);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_caplook(&tmp.path().join("absent.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_index_without_embedder_fails() {
    let (tmp, config) = setup_test_env();
    let content = fs::read_to_string(&config)
        .unwrap()
        .replace("provider = \"hash\"", "provider = \"disabled\"");
    fs::write(&config, content).unwrap();

    let (_, stderr, success) = run_caplook(&config, &["index"]);
    assert!(!success);
    assert!(stderr.contains("requires an embedding provider"));
    assert!(!tmp.path().join("data").join("caplook.sqlite").exists());
}
