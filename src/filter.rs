//! Source file enumeration with gitignore rules and include/exclude globs.
//!
//! Precedence, first match wins:
//! 1. Hard internal ignores (`.git/`, `node_modules/`, `vendor/`, minified bundles)
//! 2. Gitignore-style rules (`.gitignore`, `.ignore`)
//! 3. Registered extension
//! 4. Include patterns (if any)
//! 5. Exclude patterns
//!
//! Same inputs, same output: enumeration is sorted by path.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::diagnostics::{Diagnostic, SkipReason};
use crate::error::{Result, UsedByError};
use crate::ingest::detect::{normalize_extension, Language};
use crate::validation::relative_path;

/// Directories that are never scanned.
const INTERNAL_IGNORE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "vendor",
    "bower_components",
    "target",
    ".cache",
];

/// File name suffixes that are never scanned.
const INTERNAL_IGNORE_SUFFIXES: &[&str] = &[".min.js", ".min.css", ".bundle.js", ".map"];

/// Filtering state for one root.
pub struct FileFilter {
    root: PathBuf,
    gitignore: Option<Gitignore>,
    include_patterns: Vec<globset::GlobMatcher>,
    exclude_patterns: Vec<globset::GlobMatcher>,
    extensions: BTreeSet<String>,
}

impl FileFilter {
    /// Create a filter for `root`, accepting every default extension.
    ///
    /// Patterns are matched against `/`-separated paths relative to `root`.
    pub fn new(root: &Path, include_patterns: &[String], exclude_patterns: &[String]) -> Result<Self> {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let gitignore = Self::load_gitignore(&root);
        let include_patterns = Self::compile_globs(include_patterns)?;
        let exclude_patterns = Self::compile_globs(exclude_patterns)?;
        let extensions = Language::DEFAULT_EXTENSIONS
            .iter()
            .map(|(ext, _)| ext.to_string())
            .collect();

        Ok(Self {
            root,
            gitignore,
            include_patterns,
            exclude_patterns,
            extensions,
        })
    }

    /// Replace the accepted extensions (e.g. with a scanner's registry).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_gitignore(root: &Path) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(root);
        for name in [".gitignore", ".ignore"] {
            let path = root.join(name);
            if path.exists() {
                if let Some(err) = builder.add(&path) {
                    warn!("failed to load {}: {}", path.display(), err);
                }
            }
        }
        match builder.build() {
            Ok(gitignore) => Some(gitignore),
            Err(err) => {
                warn!("ignoring gitignore rules under {}: {}", root.display(), err);
                None
            }
        }
    }

    fn compile_globs(patterns: &[String]) -> Result<Vec<globset::GlobMatcher>> {
        patterns
            .iter()
            .map(|pattern| {
                globset::Glob::new(pattern)
                    .map(|glob| glob.compile_matcher())
                    .map_err(|e| UsedByError::InvalidPattern {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })
            })
            .collect()
    }

    /// Reason to skip `path`, or `None` when it should be scanned.
    pub fn should_skip(&self, path: &Path) -> Option<SkipReason> {
        if !path.is_file() {
            return Some(SkipReason::NotAFile);
        }
        if self.is_internal_ignore(path) {
            return Some(SkipReason::IgnoredInternal);
        }
        if self.is_gitignored(path) {
            return Some(SkipReason::IgnoredByGitignore);
        }

        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&normalize_extension(e)));
        if !supported {
            return Some(SkipReason::UnsupportedLanguage);
        }

        let rel_path = relative_path(&self.root, path);
        if !self.include_patterns.is_empty()
            && !self.include_patterns.iter().any(|m| m.is_match(&rel_path))
        {
            return Some(SkipReason::ExcludedByGlob);
        }
        if self.exclude_patterns.iter().any(|m| m.is_match(&rel_path)) {
            return Some(SkipReason::ExcludedByGlob);
        }

        None
    }

    fn is_gitignored(&self, path: &Path) -> bool {
        let Some(gitignore) = &self.gitignore else {
            return false;
        };
        let check_path = path.strip_prefix(&self.root).unwrap_or(path);
        if gitignore.matched(check_path, false).is_ignore() {
            return true;
        }
        // directory patterns such as "build/" match every file below them
        check_path
            .ancestors()
            .skip(1)
            .take_while(|a| !a.as_os_str().is_empty())
            .any(|ancestor| gitignore.matched(ancestor, true).is_ignore())
    }

    fn is_internal_ignore(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let lower = name.to_ascii_lowercase();
            if INTERNAL_IGNORE_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
                return true;
            }
        }
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components().any(|c| match c {
            Component::Normal(dir) => dir
                .to_str()
                .is_some_and(|d| INTERNAL_IGNORE_DIRS.contains(&d)),
            _ => false,
        })
    }

    fn is_internal_dir(&self, path: &Path) -> bool {
        path != self.root
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|d| INTERNAL_IGNORE_DIRS.contains(&d))
    }
}

/// Create a diagnostic for a skipped file.
pub fn skip_diagnostic(root: &Path, path: &Path, reason: SkipReason) -> Diagnostic {
    Diagnostic::skipped(relative_path(root, path), reason)
}

/// Walk `filter.root()` and return every file to scan, sorted.
///
/// Skipped files come back as diagnostics; unsupported extensions are only
/// logged at debug level since most trees are full of them.
pub fn collect_source_files(filter: &FileFilter) -> (Vec<PathBuf>, Vec<Diagnostic>) {
    let root = filter.root();
    let mut files = Vec::new();
    let mut diagnostics = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && filter.is_internal_dir(entry.path())));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                warn!("cannot walk {}: {}", path.display(), err);
                diagnostics.push(Diagnostic::error(
                    relative_path(root, &path),
                    crate::diagnostics::DiagnosticStage::Read,
                    err.to_string(),
                ));
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        match filter.should_skip(path) {
            None => files.push(path.to_path_buf()),
            Some(SkipReason::UnsupportedLanguage) => {
                debug!("skip {}: unsupported extension", path.display());
            }
            Some(reason) => diagnostics.push(skip_diagnostic(root, path, reason)),
        }
    }

    files.sort();
    diagnostics.sort();
    (files, diagnostics)
}
