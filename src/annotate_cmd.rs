//! Annotate command: scan, then rewrite doc blocks in place.

use anyhow::Result;
use std::path::PathBuf;
use usedby::{annotate_paths, Config, ScanDepth};

use crate::scan_cmd::{report_diagnostics, scan_root};

/// Returns the number of files that could not be updated.
pub async fn run_annotate(root: PathBuf, config: &Config, dry_run: bool) -> Result<usize> {
    let mut config = config.clone();
    // annotations come from usages
    config.scan_depth = ScanDepth::Deep;

    let outcome = scan_root(&root, &config).await?;
    report_diagnostics(&outcome.result.diagnostics);

    let options = config.annotate_options(Some(&outcome.root));
    let report = annotate_paths(&outcome.root, &outcome.result.symbols, &options, dry_run).await;
    report_diagnostics(&report.diagnostics);

    let verb = if dry_run { "Would update" } else { "Updated" };
    for path in &report.updated {
        println!("{} {}", verb, path);
    }
    println!(
        "{} {} files, {} unchanged, {} failed",
        verb,
        report.updated.len(),
        report.unchanged,
        report.failed
    );
    Ok(report.failed)
}
