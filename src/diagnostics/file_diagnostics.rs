//! File-level diagnostics: skip reasons and per-stage errors.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::UsedByError;

/// Why a file took no part in a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not a regular file
    NotAFile,
    /// No extractor registered for the extension
    UnsupportedLanguage,
    /// Hard-coded ignore (`.git/`, `node_modules/`, `vendor/`, ...)
    IgnoredInternal,
    /// Matched by `.gitignore` / `.ignore`
    IgnoredByGitignore,
    /// Matched an exclude glob or missed every include glob
    ExcludedByGlob,
    /// No block-comment style known for the extension
    NoCommentStyle,
}

impl SkipReason {
    /// Stable sort key; lower reports first.
    pub fn sort_key(&self) -> u8 {
        match self {
            SkipReason::IgnoredInternal => 0,
            SkipReason::IgnoredByGitignore => 1,
            SkipReason::ExcludedByGlob => 2,
            SkipReason::UnsupportedLanguage => 3,
            SkipReason::NoCommentStyle => 4,
            SkipReason::NotAFile => 5,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::NotAFile => "not a regular file",
            SkipReason::UnsupportedLanguage => "language not supported",
            SkipReason::IgnoredInternal => "internal ignore rule",
            SkipReason::IgnoredByGitignore => "matched by gitignore",
            SkipReason::ExcludedByGlob => "excluded by pattern",
            SkipReason::NoCommentStyle => "no comment style for extension",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl PartialOrd for SkipReason {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkipReason {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Pipeline stage where a per-file error happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStage {
    Read,
    Parse,
    Annotate,
    Write,
    Other,
}

impl DiagnosticStage {
    pub fn sort_key(&self) -> u8 {
        match self {
            DiagnosticStage::Read => 0,
            DiagnosticStage::Parse => 1,
            DiagnosticStage::Annotate => 2,
            DiagnosticStage::Write => 3,
            DiagnosticStage::Other => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticStage::Read => "reading file",
            DiagnosticStage::Parse => "parsing source",
            DiagnosticStage::Annotate => "updating doc blocks",
            DiagnosticStage::Write => "writing file",
            DiagnosticStage::Other => "processing",
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl PartialOrd for DiagnosticStage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticStage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A skipped file or a per-file error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    Skipped {
        /// Path relative to the scan root
        path: String,
        reason: SkipReason,
    },
    Error {
        /// Path relative to the scan root
        path: String,
        stage: DiagnosticStage,
        message: String,
    },
}

impl Diagnostic {
    pub fn path(&self) -> &str {
        match self {
            Diagnostic::Skipped { path, .. } | Diagnostic::Error { path, .. } => path,
        }
    }

    /// Path first, then errors before skips, then stage or reason.
    pub fn sort_key(&self) -> (&str, u8, u8) {
        match self {
            Diagnostic::Error { path, stage, .. } => (path, 0, stage.sort_key()),
            Diagnostic::Skipped { path, reason } => (path, 1, reason.sort_key()),
        }
    }

    pub fn skipped(path: impl Into<String>, reason: SkipReason) -> Self {
        Diagnostic::Skipped {
            path: path.into(),
            reason,
        }
    }

    pub fn error(path: impl Into<String>, stage: DiagnosticStage, message: impl Into<String>) -> Self {
        Diagnostic::Error {
            path: path.into(),
            stage,
            message: message.into(),
        }
    }

    /// Diagnostic for a typed error, tagged with its stable code.
    pub fn from_error(path: impl Into<String>, stage: DiagnosticStage, error: &UsedByError) -> Self {
        Self::error(path, stage, format!("[{}] {}", error.code(), error))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::Error { .. })
    }

    /// One-line form for stderr.
    ///
    /// - `SKIP vendor/lib.php: internal ignore rule`
    /// - `ERROR src/bad.js: reading file: permission denied`
    pub fn format_stderr(&self) -> String {
        match self {
            Diagnostic::Skipped { path, reason } => format!("SKIP {}: {}", path, reason),
            Diagnostic::Error {
                path,
                stage,
                message,
            } => format!("ERROR {}: {}: {}", path, stage, message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_stderr())
    }
}

impl PartialOrd for Diagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Diagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}
