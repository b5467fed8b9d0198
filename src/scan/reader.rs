//! Bounded concurrent file reads.
//!
//! Reads are issued in groups of `batch_size` and each group is awaited
//! before the next starts. Parsing never happens here.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::diagnostics::{Diagnostic, DiagnosticStage};
use crate::error::UsedByError;
use crate::validation::relative_path;

/// Default number of reads in flight.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// File content keyed by its root-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

async fn read_one(path: PathBuf) -> (PathBuf, std::io::Result<Vec<u8>>) {
    let result = tokio::fs::read(&path).await;
    (path, result)
}

/// Read `paths` concurrently, `batch_size` at a time.
///
/// Unreadable or non-UTF-8 files are skipped and reported as diagnostics.
/// Both outputs are sorted by path.
pub async fn read_sources(
    root: &Path,
    paths: &[PathBuf],
    batch_size: usize,
) -> (Vec<SourceFile>, Vec<Diagnostic>) {
    let mut files = Vec::with_capacity(paths.len());
    let mut diagnostics = Vec::new();

    for group in paths.chunks(batch_size.max(1)) {
        let tasks: Vec<_> = group
            .iter()
            .map(|path| (path.clone(), tokio::spawn(read_one(path.clone()))))
            .collect();

        for (path, task) in tasks {
            let key = relative_path(root, &path);
            let error = match task.await {
                Ok((_, Ok(bytes))) => match String::from_utf8(bytes) {
                    Ok(content) => {
                        files.push(SourceFile::new(key, content));
                        continue;
                    }
                    Err(_) => "not valid UTF-8".to_string(),
                },
                Ok((_, Err(e))) => e.to_string(),
                Err(e) => format!("read task failed: {}", e),
            };
            let error = UsedByError::FileRead {
                path: key.clone(),
                message: error,
            };
            warn!("skipping {}: {}", key, error);
            diagnostics.push(Diagnostic::from_error(key, DiagnosticStage::Read, &error));
        }
        debug!("read group of {} files", group.len());
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    diagnostics.sort();
    (files, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_sources_sorted_and_relative() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("js")).unwrap();
        std::fs::write(root.join("js/app.js"), "init();").unwrap();
        std::fs::write(root.join("a.php"), "<?php").unwrap();

        let paths = vec![root.join("js/app.js"), root.join("a.php")];
        let (files, diagnostics) = read_sources(root, &paths, 1).await;

        assert!(diagnostics.is_empty());
        let keys: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(keys, vec!["a.php", "js/app.js"]);
        assert_eq!(files[1].content, "init();");
    }

    #[tokio::test]
    async fn test_unreadable_file_becomes_diagnostic() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("ok.css"), ".a{}").unwrap();
        std::fs::write(root.join("bin.js"), [0xff, 0xfe, 0x00]).unwrap();

        let paths = vec![root.join("ok.css"), root.join("missing.js"), root.join("bin.js")];
        let (files, diagnostics) = read_sources(root, &paths, DEFAULT_BATCH_SIZE).await;

        assert_eq!(files.len(), 1);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].path(), "bin.js");
        assert!(diagnostics[0].format_stderr().contains("UTF-8"));
        assert_eq!(diagnostics[1].path(), "missing.js");
    }
}
