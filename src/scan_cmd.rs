//! Scan command and the scan pipeline shared by every command.

use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};
use usedby::output::output_json;
use usedby::{
    collect_source_files, save_scan_result, scan_paths, Config, Diagnostic, FileFilter,
    OutputFormat, ScanResult, Scanner, UsedByError,
};

/// Scanner state after a full pass over `root`.
pub struct ScanOutcome {
    /// Canonical scan root; symbol paths are relative to it
    pub root: PathBuf,
    pub scanner: Scanner,
    pub result: ScanResult,
}

/// Print diagnostics on stderr, one line each.
pub fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic.format_stderr());
    }
}

/// Enumerate, read and scan every source file under `root`.
///
/// A missing root stops before any work is done.
pub async fn scan_root(root: &Path, config: &Config) -> Result<ScanOutcome> {
    if !root.exists() {
        return Err(UsedByError::InputNotFound(root.to_path_buf()).into());
    }

    let mut scanner = Scanner::with_default_parsers();
    let filter = FileFilter::new(root, &config.include, &config.exclude)
        .context("invalid include/exclude pattern")?
        .with_extensions(scanner.extensions());
    let (paths, mut diagnostics) = collect_source_files(&filter);
    info!("{} source files under {}", paths.len(), filter.root().display());

    let mut result = scan_paths(&mut scanner, filter.root(), &paths, &config.scan_options()).await;
    diagnostics.append(&mut result.diagnostics);
    diagnostics.sort();
    result.diagnostics = diagnostics;

    Ok(ScanOutcome {
        root: filter.root().to_path_buf(),
        scanner,
        result,
    })
}

pub async fn run_scan(
    root: PathBuf,
    config: &Config,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let outcome = scan_root(&root, config).await?;
    report_diagnostics(&outcome.result.diagnostics);

    if let Some(path) = &output {
        save_scan_result(path, &outcome.result)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => output_json(&outcome.result)?,
        OutputFormat::Human => {
            let result = &outcome.result;
            println!(
                "Scanned {} files: {} symbols, {} usages ({} ms)",
                result.files_scanned, result.symbols_found, result.usages_found, result.scan_time
            );
            if let Some(path) = &output {
                println!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}
