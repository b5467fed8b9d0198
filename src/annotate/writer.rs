//! Write-back of annotated sources.
//!
//! One file at a time: read, compute, compare, write only when the content
//! differs. A failing file is reported and the others continue.

use std::collections::BTreeSet;
use std::path::Path;

use log::{debug, info, warn};

use super::{annotate_file, has_annotations, AnnotateOptions, CommentStyle};
use crate::diagnostics::{Diagnostic, DiagnosticStage, SkipReason};
use crate::error::{Result, UsedByError};
use crate::ingest::Symbol;
use crate::validation::validate_path_within_root;

/// Outcome of [`annotate_paths`].
#[derive(Debug, Clone, Default)]
pub struct AnnotateReport {
    /// Files rewritten (or that would be, on a dry run), root-relative
    pub updated: Vec<String>,
    pub unchanged: usize,
    pub failed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnnotateReport {
    fn fail(&mut self, path: &str, stage: DiagnosticStage, error: &UsedByError) {
        warn!("[{}] {}", error.code(), error);
        self.failed += 1;
        self.diagnostics.push(Diagnostic::from_error(path, stage, error));
    }
}

/// Write `new_content` to `path` unless it already holds exactly that.
///
/// Returns whether the file was written.
pub async fn write_if_changed(path: &Path, new_content: &str) -> Result<bool> {
    match tokio::fs::read_to_string(path).await {
        Ok(current) if current == new_content => return Ok(false),
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(UsedByError::FileRead {
                path: path.display().to_string(),
                message: err.to_string(),
            })
        }
    }

    tokio::fs::write(path, new_content)
        .await
        .map_err(|err| UsedByError::FileWrite {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
    Ok(true)
}

/// Annotate every file under `root` that defines a symbol with usages.
///
/// Symbol file paths are taken relative to `root`. With `dry_run` nothing
/// is written and `updated` lists the files that would change.
pub async fn annotate_paths(
    root: &Path,
    symbols: &[Symbol],
    options: &AnnotateOptions,
    dry_run: bool,
) -> AnnotateReport {
    let mut report = AnnotateReport::default();

    let files: BTreeSet<&str> = symbols.iter().map(|s| s.file_path.as_str()).collect();
    for file in files {
        if !has_annotations(file, symbols, &options.annotations) {
            continue;
        }
        if CommentStyle::for_path(file).is_none() {
            debug!("skip {}: no comment style", file);
            report
                .diagnostics
                .push(Diagnostic::skipped(file, SkipReason::NoCommentStyle));
            continue;
        }

        let path = match validate_path_within_root(&root.join(file), root) {
            Ok(path) => path,
            Err(err) => {
                report.fail(file, DiagnosticStage::Read, &UsedByError::Path(err));
                continue;
            }
        };

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) => {
                let error = UsedByError::FileRead {
                    path: file.to_string(),
                    message: err.to_string(),
                };
                report.fail(file, DiagnosticStage::Read, &error);
                continue;
            }
        };

        let annotated = annotate_file(&content, file, symbols, options);
        if annotated == content {
            report.unchanged += 1;
            continue;
        }
        if dry_run {
            info!("would update {}", file);
            report.updated.push(file.to_string());
            continue;
        }

        match write_if_changed(&path, &annotated).await {
            Ok(true) => {
                info!("updated {}", file);
                report.updated.push(file.to_string());
            }
            Ok(false) => report.unchanged += 1,
            Err(err) => report.fail(file, DiagnosticStage::Write, &err),
        }
    }

    report.diagnostics.sort();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{Position, Range, SymbolKind, Usage, UsageKind};
    use tempfile::TempDir;

    fn helper_symbol() -> Symbol {
        let position = Position::new(0, 9);
        let range = Range {
            start: position,
            end: position,
        };
        let mut symbol = Symbol::new("helper", SymbolKind::Function, "lib.js", position, range);
        let at = Position::new(0, 0);
        symbol.usages.push(Usage {
            file_path: "app.js".into(),
            position: at,
            range: Range { start: at, end: at },
            context: "helper();".into(),
            kind: UsageKind::Call,
        });
        symbol
    }

    #[tokio::test]
    async fn test_write_if_changed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.js");
        assert!(write_if_changed(&path, "x\n").await.unwrap());
        assert!(!write_if_changed(&path, "x\n").await.unwrap());
        assert!(write_if_changed(&path, "y\n").await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "y\n");
    }

    #[tokio::test]
    async fn test_annotate_paths_writes_then_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("lib.js"), "function helper() {}\n").unwrap();
        let symbols = vec![helper_symbol()];

        let report = annotate_paths(root, &symbols, &AnnotateOptions::default(), false).await;
        assert_eq!(report.updated, vec!["lib.js".to_string()]);
        assert_eq!(report.failed, 0);
        let written = std::fs::read_to_string(root.join("lib.js")).unwrap();
        assert!(written.contains("@usedby app.js:1 (call)"));

        let report = annotate_paths(root, &symbols, &AnnotateOptions::default(), false).await;
        assert!(report.updated.is_empty());
        assert_eq!(report.unchanged, 1);
    }

    #[tokio::test]
    async fn test_annotate_paths_dry_run_and_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("lib.js"), "function helper() {}\n").unwrap();
        let mut missing = helper_symbol();
        missing.file_path = "gone.js".into();
        let symbols = vec![helper_symbol(), missing];

        let report = annotate_paths(root, &symbols, &AnnotateOptions::default(), true).await;
        assert_eq!(report.updated, vec!["lib.js".to_string()]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.diagnostics[0].path(), "gone.js");
        assert_eq!(std::fs::read_to_string(root.join("lib.js")).unwrap(), "function helper() {}\n");
    }
}
