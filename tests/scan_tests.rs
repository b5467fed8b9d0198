//! Scan pipeline tests over in-memory batches and real directories

use std::collections::HashSet;

use tempfile::TempDir;
use usedby::{
    build_graph, collect_source_files, generate_mermaid_diagram, scan_paths, DiagramOptions,
    FileFilter, GraphOptions, ScanOptions, Scanner, SourceFile, SymbolKind, UsageKind,
};

fn mixed_batch() -> Vec<SourceFile> {
    vec![
        SourceFile::new(
            "lib/payments.php",
            "<?php\nclass PaymentProcessor {\n    public function charge($amount) {}\n}\nfunction format_amount($v) {}\n",
        ),
        SourceFile::new(
            "cart.php",
            "<?php\n$p = new PaymentProcessor();\n$p->charge(5);\necho format_amount(5);\n",
        ),
        SourceFile::new("css/style.css", ".btn { color: red; }\n#main { margin: 0; }\n"),
        SourceFile::new(
            "js/app.js",
            "function init() {\n    document.querySelector('.btn');\n}\ninit();\n",
        ),
    ]
}

#[test]
fn test_symbol_ids_unique() {
    let mut scanner = Scanner::with_default_parsers();
    let result = scanner.process_batch(&mixed_batch(), &ScanOptions::default());

    let ids: HashSet<&str> = result.symbols.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids.len(), result.symbols.len());
    assert_eq!(result.symbols_found, result.symbols.len());
    assert_eq!(result.files_scanned, 4);
}

#[test]
fn test_empty_batch() {
    let mut scanner = Scanner::with_default_parsers();
    let result = scanner.process_batch(&[], &ScanOptions::default());

    assert_eq!(result.symbols_found, 0);
    assert_eq!(result.usages_found, 0);
    assert!(result.symbols.is_empty());

    let graph = build_graph(&result.symbols, &GraphOptions::default());
    assert_eq!(generate_mermaid_diagram(&graph, &DiagramOptions::default()), "graph TD");
}

#[test]
fn test_rescan_keeps_ids_stable() {
    let mut scanner = Scanner::with_default_parsers();
    let first = scanner.process_batch(&mixed_batch(), &ScanOptions::default());
    let second = scanner.process_batch(&mixed_batch(), &ScanOptions::default());

    let first_ids: Vec<&str> = first.symbols.iter().map(|s| s.id.as_str()).collect();
    let second_ids: Vec<&str> = second.symbols.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(first.usages_found, second.usages_found);
}

#[test]
fn test_no_usage_on_definition_line() {
    let mut scanner = Scanner::with_default_parsers();
    let result = scanner.process_batch(&mixed_batch(), &ScanOptions::default());

    for symbol in &result.symbols {
        for usage in &symbol.usages {
            assert!(
                !symbol.is_definition_site(&usage.file_path, usage.position.line),
                "{} cites its own definition",
                symbol.name
            );
        }
    }
}

#[test]
fn test_cross_file_usages() {
    let mut scanner = Scanner::with_default_parsers();
    let result = scanner.process_batch(&mixed_batch(), &ScanOptions::default());

    let processor = result.symbols.iter().find(|s| s.name == "PaymentProcessor").unwrap();
    assert_eq!(processor.kind, SymbolKind::Class);
    assert_eq!(processor.usages.len(), 1);
    assert_eq!(processor.usages[0].file_path, "cart.php");
    assert_eq!(processor.usages[0].kind, UsageKind::Call);

    let init = result.symbols.iter().find(|s| s.name == "init").unwrap();
    assert_eq!(init.usages.len(), 1);
    assert_eq!(init.usages[0].position.line, 3);

    let btn = result.symbols.iter().find(|s| s.name == ".btn").unwrap();
    assert_eq!(btn.usages.len(), 1);
    assert_eq!(btn.usages[0].file_path, "js/app.js");
}

#[test]
fn test_batch_order_does_not_matter() {
    let files = mixed_batch();
    let mut reversed = files.clone();
    reversed.reverse();

    let forward = Scanner::with_default_parsers().process_batch(&files, &ScanOptions::default());
    let backward = Scanner::with_default_parsers().process_batch(&reversed, &ScanOptions::default());
    assert_eq!(forward.symbols, backward.symbols);
    assert_eq!(forward.usages_found, backward.usages_found);
}

#[tokio::test]
async fn test_scan_paths_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("js")).unwrap();
    std::fs::create_dir_all(root.join("node_modules/dep")).unwrap();
    std::fs::write(root.join("js/lib.js"), "function helper() {}\n").unwrap();
    std::fs::write(root.join("js/app.js"), "helper();\n").unwrap();
    std::fs::write(root.join("node_modules/dep/index.js"), "helper();\n").unwrap();
    std::fs::write(root.join("README.md"), "helper\n").unwrap();

    let mut scanner = Scanner::with_default_parsers();
    let filter = FileFilter::new(root, &[], &[])
        .unwrap()
        .with_extensions(scanner.extensions());
    let (paths, _) = collect_source_files(&filter);
    assert_eq!(paths.len(), 2);

    let result = scan_paths(&mut scanner, filter.root(), &paths, &ScanOptions::default()).await;
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.files_scanned, 2);
    assert_eq!(result.symbols_found, 1);
    assert_eq!(result.symbols[0].file_path, "js/lib.js");
    assert_eq!(result.symbols[0].usages[0].file_path, "js/app.js");
}

#[tokio::test]
async fn test_scan_paths_exclude_glob() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("legacy")).unwrap();
    std::fs::write(root.join("a.js"), "function a() {}\n").unwrap();
    std::fs::write(root.join("legacy/b.js"), "function b() {}\n").unwrap();

    let mut scanner = Scanner::with_default_parsers();
    let filter = FileFilter::new(root, &[], &["legacy/**".to_string()])
        .unwrap()
        .with_extensions(scanner.extensions());
    let (paths, diagnostics) = collect_source_files(&filter);
    assert_eq!(paths.len(), 1);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].path(), "legacy/b.js");

    let result = scan_paths(&mut scanner, filter.root(), &paths, &ScanOptions::basic()).await;
    assert_eq!(result.symbols.len(), 1);
    assert_eq!(result.symbols[0].name, "a");
}
