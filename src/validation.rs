//! Path normalization and root containment checks.
//!
//! Symbol tables key files by root-relative, `/`-separated paths so that
//! ids and `@usedby` entries are identical on every platform. Write-back
//! only touches files that resolve inside the scan root.

use camino::Utf8Path;
use std::path::{Component, Path, PathBuf};

/// Error types for path validation.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    /// Path cannot be canonicalized (doesn't exist or permission denied)
    #[error("cannot canonicalize path: {0}")]
    CannotCanonicalize(String),

    /// Resolved path escapes the scan root
    #[error("path escapes scan root: {0} (root: {1})")]
    OutsideRoot(String, String),
}

/// Replace `\` with `/` and drop a leading `./`.
pub fn normalize_separators(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .map(str::to_string)
        .unwrap_or(normalized)
}

/// Lexically resolve `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Path of `path` relative to `root`, `/`-separated.
///
/// Paths outside `root` are returned normalized but otherwise unchanged.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let root = normalize_path(root);
    let path = normalize_path(path);
    let relative = path.strip_prefix(&root).unwrap_or(&path);
    let text = match Utf8Path::from_path(relative) {
        Some(utf8) => utf8.as_str().to_string(),
        None => relative.to_string_lossy().to_string(),
    };
    normalize_separators(&text)
}

/// Render a stored file key relative to `root` when one is given.
///
/// Keys are already root-relative after a scan; absolute keys are rebased.
pub fn display_path(file_path: &str, root: Option<&Path>) -> String {
    match root {
        Some(root) if Path::new(file_path).is_absolute() => relative_path(root, Path::new(file_path)),
        _ => normalize_separators(file_path),
    }
}

/// Canonicalize a path using std::fs::canonicalize.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, PathValidationError> {
    std::fs::canonicalize(path)
        .map_err(|_| PathValidationError::CannotCanonicalize(path.to_string_lossy().to_string()))
}

/// Validate that `path` resolves inside `root`, returning the canonical path.
pub fn validate_path_within_root(path: &Path, root: &Path) -> Result<PathBuf, PathValidationError> {
    let canonical_path = canonicalize_path(path)?;
    let canonical_root = canonicalize_path(root)?;

    if !canonical_path.starts_with(&canonical_root) {
        return Err(PathValidationError::OutsideRoot(
            canonical_path.to_string_lossy().to_string(),
            canonical_root.to_string_lossy().to_string(),
        ));
    }

    Ok(canonical_path)
}
