//! Command-line tests against the built binary

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn usedby(args: &[&str]) -> Output {
    let bin_path = std::env::var("CARGO_BIN_EXE_usedby").unwrap_or_else(|_| {
        let mut path = std::env::current_exe().unwrap();
        path.pop();
        path.pop();
        path.push("usedby");
        path.to_str().unwrap().to_string()
    });

    Command::new(&bin_path)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute usedby")
}

fn write_project(root: &Path) {
    std::fs::write(root.join("lib.js"), "function helper() {}\n").unwrap();
    std::fs::write(root.join("app.js"), "helper();\n").unwrap();
}

#[test]
fn test_scan_json_output() {
    let temp_dir = TempDir::new().unwrap();
    write_project(temp_dir.path());
    let root = temp_dir.path().to_str().unwrap();

    let output = usedby(&["scan", "--root", root, "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["filesScanned"], 2);
    assert_eq!(json["symbolsFound"], 1);
    assert_eq!(json["usagesFound"], 1);
}

#[test]
fn test_scan_writes_output_file() {
    let temp_dir = TempDir::new().unwrap();
    write_project(temp_dir.path());
    let root = temp_dir.path().to_str().unwrap();
    let out = temp_dir.path().join("reports/scan.json");

    let output = usedby(&["scan", "--root", root, "--output", out.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Scanned 2 files: 1 symbols, 1 usages"));

    let saved = usedby::load_scan_result(&out).unwrap();
    assert_eq!(saved.symbols_found, 1);
}

#[test]
fn test_annotate_dry_run_leaves_files() {
    let temp_dir = TempDir::new().unwrap();
    write_project(temp_dir.path());
    let root = temp_dir.path().to_str().unwrap();

    let output = usedby(&["annotate", "--root", root, "--dry-run"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Would update lib.js"));
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("lib.js")).unwrap(),
        "function helper() {}\n"
    );

    let output = usedby(&["annotate", "--root", root]);
    assert!(output.status.success());
    let lib = std::fs::read_to_string(temp_dir.path().join("lib.js")).unwrap();
    assert!(lib.contains(" * @usedby app.js:1 (call)\n"));
}

#[test]
fn test_graph_to_stdout() {
    let temp_dir = TempDir::new().unwrap();
    write_project(temp_dir.path());
    let root = temp_dir.path().to_str().unwrap();

    let output = usedby(&["graph", "--root", root, "--direction", "LR", "--labels"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("graph LR\n"));
    assert!(stdout.contains("file_app_js -->|call| helper"));
}

#[test]
fn test_graph_unknown_symbol_fails() {
    let temp_dir = TempDir::new().unwrap();
    write_project(temp_dir.path());
    let root = temp_dir.path().to_str().unwrap();

    let output = usedby(&["graph", "--root", root, "--symbol", "missing"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("symbol not found: missing"));
}

#[test]
fn test_missing_root_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope");

    let output = usedby(&["scan", "--root", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("input not found"));
}

#[test]
fn test_unknown_command_exits_nonzero() {
    let output = usedby(&["frobnicate"]);
    assert_eq!(output.status.code(), Some(1));
}
