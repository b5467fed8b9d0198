//! Stable error codes
//!
//! Codes follow the pattern: UB-{CATEGORY}-{3-digit number}
//!
//! Categories (2-3 uppercase letters):
//! - IO: input paths, reading and writing files
//! - DOC: doc-block parsing and rewriting
//! - PRS: symbol extraction
//! - CFG: configuration, patterns and persisted JSON
//!
//! A code is never reused once published.
//!
//! # I/O Errors (UB-IO-*)
//!
//! | Code | Description | Remediation |
//! |------|-------------|-------------|
//! | UB-IO-001 | Input not found | Check `--root` and target paths |
//! | UB-IO-002 | File unreadable | Check permissions; the file is skipped |
//! | UB-IO-003 | Write failed | Check the file is writable; other files continue |
//! | UB-IO-004 | I/O failure | See the attached OS error |
//!
//! # Doc-block Errors (UB-DOC-*)
//!
//! | Code | Description | Remediation |
//! |------|-------------|-------------|
//! | UB-DOC-001 | Malformed doc block | Close the comment; a fresh block was inserted below it |
//!
//! # Extraction (UB-PRS-*)
//!
//! | Code | Description | Remediation |
//! |------|-------------|-------------|
//! | UB-PRS-001 | Unmatched nesting | Fix braces; members of that construct were skipped |
//!
//! # Configuration (UB-CFG-*)
//!
//! | Code | Description | Remediation |
//! |------|-------------|-------------|
//! | UB-CFG-001 | Invalid glob | Fix the pattern in `usedby.json` or on the command line |
//! | UB-CFG-002 | Invalid JSON | Fix or delete the file |

/// Named input or target path does not exist
pub const UB_IO_001_INPUT_NOT_FOUND: &str = "UB-IO-001";

/// A file could not be read during a batch
pub const UB_IO_002_FILE_READ: &str = "UB-IO-002";

/// Annotated content could not be written back
pub const UB_IO_003_FILE_WRITE: &str = "UB-IO-003";

/// Other I/O failure
pub const UB_IO_004_IO: &str = "UB-IO-004";

/// Existing comment block has no matching delimiter
pub const UB_DOC_001_MALFORMED_DOC_BLOCK: &str = "UB-DOC-001";

/// Unmatched nesting while extracting a construct
pub const UB_PRS_001_PARSE_AMBIGUITY: &str = "UB-PRS-001";

/// Invalid include/exclude glob
pub const UB_CFG_001_INVALID_PATTERN: &str = "UB-CFG-001";

/// Invalid JSON in a config or scan-result file
pub const UB_CFG_002_INVALID_JSON: &str = "UB-CFG-002";
