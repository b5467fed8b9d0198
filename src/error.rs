//! Typed errors for module seams.
//!
//! Library functions that can fail per file return [`UsedByError`]; the
//! driver wraps them in `anyhow` with context.

use std::path::PathBuf;

use crate::error_codes;
use crate::validation::PathValidationError;

#[derive(Debug, thiserror::Error)]
pub enum UsedByError {
    /// Named input or target path is missing. Fatal.
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("cannot read {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("cannot write {path}: {message}")]
    FileWrite { path: String, message: String },

    /// Comment block above a definition has no opening or closing delimiter
    #[error("malformed doc block above {symbol} at {path}:{line}")]
    MalformedDocBlock {
        path: String,
        symbol: String,
        line: usize,
    },

    /// Unmatched nesting while extracting a construct
    #[error("unmatched nesting in {path} at line {line}")]
    ParseAmbiguity { path: String, line: usize },

    #[error("invalid pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Path(#[from] PathValidationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl UsedByError {
    /// Stable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            UsedByError::InputNotFound(_) => error_codes::UB_IO_001_INPUT_NOT_FOUND,
            UsedByError::FileRead { .. } => error_codes::UB_IO_002_FILE_READ,
            UsedByError::FileWrite { .. } => error_codes::UB_IO_003_FILE_WRITE,
            UsedByError::Io(_) | UsedByError::Path(_) => error_codes::UB_IO_004_IO,
            UsedByError::MalformedDocBlock { .. } => error_codes::UB_DOC_001_MALFORMED_DOC_BLOCK,
            UsedByError::ParseAmbiguity { .. } => error_codes::UB_PRS_001_PARSE_AMBIGUITY,
            UsedByError::InvalidPattern { .. } => error_codes::UB_CFG_001_INVALID_PATTERN,
            UsedByError::Json(_) => error_codes::UB_CFG_002_INVALID_JSON,
        }
    }

    /// Whether the error stops the whole invocation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            UsedByError::InputNotFound(_) | UsedByError::InvalidPattern { .. } | UsedByError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, UsedByError>;
