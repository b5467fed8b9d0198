//! Scan session: the symbol table and two-pass batch extraction.
//!
//! A [`Scanner`] is the only writer of its symbol table. Pass 1 replaces
//! every symbol of each scanned file (clear-by-file-then-reinsert); pass 2
//! recomputes every symbol's usages from scratch against the batch, so
//! reprocessing overlapping batches never duplicates symbols or usages.

pub mod freshness;
pub mod reader;

pub use reader::{read_sources, SourceFile, DEFAULT_BATCH_SIZE};

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::ingest::detect::{extension_of, normalize_extension};
use crate::ingest::{Extractor, Language, Position, SourceText, Symbol};

/// Whether a batch runs the usage-discovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDepth {
    /// Definitions and usages
    #[default]
    Deep,
    /// Definitions only
    Basic,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub depth: ScanDepth,
    /// Reads in flight per group when reading from disk
    pub batch_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            depth: ScanDepth::Deep,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ScanOptions {
    pub fn basic() -> Self {
        Self {
            depth: ScanDepth::Basic,
            ..Self::default()
        }
    }
}

/// Outcome of one batch. Serializes to the persisted scan-result schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Whole symbol table, sorted by file, line and character
    pub symbols: Vec<Symbol>,
    /// Elapsed milliseconds
    pub scan_time: u64,
    pub files_scanned: usize,
    pub symbols_found: usize,
    pub usages_found: usize,
    /// Per-file problems met while reading; not persisted
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

/// Owner of the symbol table for one scan session.
#[derive(Debug, Default)]
pub struct Scanner {
    parsers: HashMap<String, Language>,
    symbols: BTreeMap<String, Symbol>,
    file_symbols: HashMap<String, Vec<String>>,
    timestamps: HashMap<String, i64>,
}

impl Scanner {
    /// Scanner with no registered extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scanner with every default extension registered.
    pub fn with_default_parsers() -> Self {
        let mut scanner = Self::new();
        for (extension, language) in Language::DEFAULT_EXTENSIONS {
            scanner.register_parser(extension, *language);
        }
        scanner
    }

    /// Map an extension to a language. The last registration wins.
    pub fn register_parser(&mut self, extension: &str, language: Language) {
        let extension = normalize_extension(extension);
        if let Some(previous) = self.parsers.insert(extension.clone(), language) {
            if previous != language {
                debug!("extension .{} now maps to {} (was {})", extension, language, previous);
            }
        }
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.parsers.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Language registered for a file's extension.
    pub fn language_for(&self, file_path: &str) -> Option<Language> {
        extension_of(file_path).and_then(|ext| self.parsers.get(&ext).copied())
    }

    /// Drop every symbol attributed to `file_path`.
    pub fn clear_file(&mut self, file_path: &str) {
        if let Some(ids) = self.file_symbols.remove(file_path) {
            for id in ids {
                self.symbols.remove(&id);
            }
        }
    }

    /// Replace the symbols of one file with a fresh extraction.
    ///
    /// Files without a registered extension yield nothing.
    pub fn scan_file(&mut self, file_path: &str, content: &str) -> Vec<Symbol> {
        self.clear_file(file_path);

        let Some(language) = self.language_for(file_path) else {
            debug!("no parser registered for {}", file_path);
            return Vec::new();
        };

        let symbols = language.parse_symbols(content, file_path);
        let mut ids = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            ids.push(symbol.id.clone());
            self.symbols.insert(symbol.id.clone(), symbol.clone());
        }
        self.file_symbols.insert(file_path.to_string(), ids);
        self.timestamps.insert(file_path.to_string(), freshness::now_millis());

        debug!("{}: {} symbols", file_path, symbols.len());
        symbols
    }

    /// Two-pass extraction over a batch.
    ///
    /// Pass 1 scans every file. Pass 2 (deep only) replaces every known
    /// symbol's usages with those found in the batch files whose language
    /// can reference it.
    pub fn process_batch(&mut self, files: &[SourceFile], options: &ScanOptions) -> ScanResult {
        let started = Instant::now();

        // later duplicates of a path win; visit in path order
        let mut batch: BTreeMap<&str, &str> = BTreeMap::new();
        for file in files {
            batch.insert(file.path.as_str(), file.content.as_str());
        }

        for (path, content) in &batch {
            self.scan_file(path, content);
        }

        if options.depth == ScanDepth::Deep {
            self.discover_usages(&batch);
        }

        let result = self.result_snapshot(batch.len(), started);
        info!(
            "scanned {} files: {} symbols, {} usages in {} ms",
            result.files_scanned, result.symbols_found, result.usages_found, result.scan_time
        );
        result
    }

    fn discover_usages(&mut self, batch: &BTreeMap<&str, &str>) {
        let prepared: Vec<(&str, Language, SourceText<'_>)> = batch
            .iter()
            .filter_map(|(path, content)| {
                let language = self.language_for(path)?;
                Some((*path, language, language.prepare(content)))
            })
            .collect();

        let origins: HashMap<String, Option<Language>> = self
            .symbols
            .values()
            .map(|s| (s.file_path.clone(), self.language_for(&s.file_path)))
            .collect();

        for symbol in self.symbols.values_mut() {
            let Some(origin) = origins.get(&symbol.file_path).copied().flatten() else {
                symbol.usages.clear();
                continue;
            };
            let mut usages = Vec::new();
            for (path, language, source) in &prepared {
                if language.accepts(origin, symbol.kind) {
                    usages.extend(language.find_usages_in(source, path, symbol));
                }
            }
            usages.sort_by(|a, b| (&a.file_path, a.position).cmp(&(&b.file_path, b.position)));
            symbol.usages = usages;
        }
    }

    fn result_snapshot(&self, files_scanned: usize, started: Instant) -> ScanResult {
        let symbols = self.all_symbols();
        let usages_found = symbols.iter().map(|s| s.usages.len()).sum();
        ScanResult {
            symbols_found: symbols.len(),
            usages_found,
            symbols,
            scan_time: started.elapsed().as_millis() as u64,
            files_scanned,
            diagnostics: Vec::new(),
        }
    }

    /// True when `file_path` was never scanned or changed after its last scan.
    pub fn file_needs_rescan(&self, file_path: &str, timestamp: i64) -> bool {
        freshness::is_stale(self.timestamps.get(file_path).copied(), timestamp)
    }

    /// When `file_path` was last scanned, in Unix milliseconds.
    pub fn last_scanned(&self, file_path: &str) -> Option<i64> {
        self.timestamps.get(file_path).copied()
    }

    /// Innermost symbol whose range contains the position.
    pub fn find_symbol_at_position(&self, file_path: &str, line: usize, character: usize) -> Option<&Symbol> {
        let position = Position::new(line, character);
        self.file_symbols
            .get(file_path)?
            .iter()
            .filter_map(|id| self.symbols.get(id))
            .filter(|s| s.range.contains(position))
            .max_by(|a, b| {
                a.range
                    .start
                    .cmp(&b.range.start)
                    .then_with(|| b.range.end.cmp(&a.range.end))
            })
    }

    pub fn symbol(&self, id: &str) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    /// Symbols of one file in source order.
    pub fn symbols_in_file(&self, file_path: &str) -> Vec<&Symbol> {
        let mut symbols: Vec<&Symbol> = self
            .file_symbols
            .get(file_path)
            .map(|ids| ids.iter().filter_map(|id| self.symbols.get(id)).collect())
            .unwrap_or_default();
        symbols.sort_by_key(|s| s.position);
        symbols
    }

    pub fn find_symbols_by_name(&self, name: &str) -> Vec<&Symbol> {
        let mut found: Vec<&Symbol> = self.symbols.values().filter(|s| s.name == name).collect();
        found.sort_by(|a, b| (&a.file_path, a.position).cmp(&(&b.file_path, b.position)));
        found
    }

    /// Every symbol sorted by file, line and character.
    pub fn all_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.symbols.values().cloned().collect();
        symbols.sort_by(|a, b| (&a.file_path, a.position).cmp(&(&b.file_path, b.position)));
        symbols
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn usage_count(&self) -> usize {
        self.symbols.values().map(|s| s.usages.len()).sum()
    }

    /// Number of files with a recorded scan.
    pub fn file_count(&self) -> usize {
        self.file_symbols.len()
    }
}

/// Read `paths` from disk and process them as one batch.
///
/// Reads run concurrently in groups of `options.batch_size`; extraction
/// runs afterwards on the full set. Read failures are reported in
/// [`ScanResult::diagnostics`].
pub async fn scan_paths(
    scanner: &mut Scanner,
    root: &Path,
    paths: &[PathBuf],
    options: &ScanOptions,
) -> ScanResult {
    let (files, diagnostics) = read_sources(root, paths, options.batch_size).await;
    let mut result = scanner.process_batch(&files, options);
    result.diagnostics = diagnostics;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{SymbolKind, UsageKind};

    #[test]
    fn test_register_parser_last_wins() {
        let mut scanner = Scanner::with_default_parsers();
        assert_eq!(scanner.language_for("a.inc"), Some(Language::Php));
        scanner.register_parser(".INC", Language::JavaScript);
        assert_eq!(scanner.language_for("lib/a.inc"), Some(Language::JavaScript));
        assert_eq!(scanner.language_for("README"), None);
    }

    #[test]
    fn test_scan_file_unregistered_extension() {
        let mut scanner = Scanner::new();
        assert!(scanner.scan_file("a.php", "<?php function f() {}").is_empty());
        assert_eq!(scanner.symbol_count(), 0);
        assert!(scanner.last_scanned("a.php").is_none());
    }

    #[test]
    fn test_rescan_replaces_symbols() {
        let mut scanner = Scanner::with_default_parsers();
        scanner.scan_file("a.js", "function one() {}\nfunction two() {}\n");
        assert_eq!(scanner.symbol_count(), 2);
        scanner.scan_file("a.js", "function one() {}\n");
        assert_eq!(scanner.symbol_count(), 1);
        assert_eq!(scanner.symbols_in_file("a.js")[0].name, "one");
    }

    #[test]
    fn test_basic_depth_skips_usages() {
        let mut scanner = Scanner::with_default_parsers();
        let files = vec![
            SourceFile::new("lib.js", "function helper() {}\n"),
            SourceFile::new("app.js", "helper();\n"),
        ];
        let result = scanner.process_batch(&files, &ScanOptions::basic());
        assert_eq!(result.symbols_found, 1);
        assert_eq!(result.usages_found, 0);
        assert_eq!(result.files_scanned, 2);

        let result = scanner.process_batch(&files, &ScanOptions::default());
        assert_eq!(result.usages_found, 1);
        assert_eq!(result.symbols[0].usages[0].kind, UsageKind::Call);
    }

    #[test]
    fn test_repeated_batches_do_not_duplicate_usages() {
        let mut scanner = Scanner::with_default_parsers();
        let files = vec![
            SourceFile::new("lib.js", "function helper() {}\n"),
            SourceFile::new("app.js", "helper();\nhelper();\n"),
        ];
        let first = scanner.process_batch(&files, &ScanOptions::default());
        let second = scanner.process_batch(&files, &ScanOptions::default());
        assert_eq!(first.usages_found, 2);
        assert_eq!(second.usages_found, 2);
        assert_eq!(first.symbols, second.symbols);
    }

    #[test]
    fn test_usages_cross_language_only_when_accepted() {
        let mut scanner = Scanner::with_default_parsers();
        let files = vec![
            SourceFile::new("style.css", ".btn { color: red; }\n"),
            SourceFile::new("app.js", "document.querySelector('.btn');\n"),
            SourceFile::new("lib.php", "<?php\nfunction btn() {}\n"),
            SourceFile::new("other.js", "btn();\n"),
        ];
        let result = scanner.process_batch(&files, &ScanOptions::default());

        let selector = result.symbols.iter().find(|s| s.kind == SymbolKind::Selector).unwrap();
        assert_eq!(selector.usages.len(), 1);
        assert_eq!(selector.usages[0].file_path, "app.js");

        let function = result.symbols.iter().find(|s| s.kind == SymbolKind::Function).unwrap();
        assert!(function.usages.is_empty());
    }

    #[test]
    fn test_batch_order_independent() {
        let files = vec![
            SourceFile::new("b.js", "class B extends A {}\n"),
            SourceFile::new("a.js", "class A {}\nnew B();\n"),
        ];
        let mut reversed = files.clone();
        reversed.reverse();

        let a = Scanner::with_default_parsers().process_batch(&files, &ScanOptions::default());
        let b = Scanner::with_default_parsers().process_batch(&reversed, &ScanOptions::default());
        assert_eq!(a.symbols, b.symbols);
    }

    #[test]
    fn test_file_needs_rescan() {
        let mut scanner = Scanner::with_default_parsers();
        assert!(scanner.file_needs_rescan("a.css", 0));
        scanner.scan_file("a.css", ".a {}");
        let stamp = scanner.last_scanned("a.css").unwrap();
        assert!(!scanner.file_needs_rescan("a.css", stamp));
        assert!(scanner.file_needs_rescan("a.css", stamp + 1));
    }

    #[test]
    fn test_find_symbol_at_position_innermost() {
        let mut scanner = Scanner::with_default_parsers();
        scanner.scan_file("m.js", "class Modal {\n    open() {\n        go();\n    }\n}\n");
        let hit = scanner.find_symbol_at_position("m.js", 2, 8).unwrap();
        assert_eq!(hit.name, "open");
        let hit = scanner.find_symbol_at_position("m.js", 4, 0).unwrap();
        assert_eq!(hit.name, "Modal");
        assert!(scanner.find_symbol_at_position("m.js", 9, 0).is_none());
        assert!(scanner.find_symbol_at_position("other.js", 0, 0).is_none());
    }

    #[test]
    fn test_find_symbols_by_name() {
        let mut scanner = Scanner::with_default_parsers();
        scanner.scan_file("b.js", "function init() {}\n");
        scanner.scan_file("a.js", "function init() {}\n");
        let found = scanner.find_symbols_by_name("init");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].file_path, "a.js");
        assert_eq!(scanner.file_count(), 2);
    }
}
