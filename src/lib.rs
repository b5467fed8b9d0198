//! usedby: cross-reference symbols and keep `@usedby` docs current
//!
//! usedby scans a mixed tree of PHP, JavaScript and CSS sources, records
//! where every class, function, method, selector, variable and event is
//! used, writes that information into the doc block above each definition
//! and renders relationship diagrams in the Mermaid DSL.
//!
//! # Position Conventions
//!
//! - **Line positions**: 0-indexed in symbols and usages
//! - **Character positions**: 0-indexed, counted in Unicode scalar values
//! - **`@usedby` line numbers**: 1-indexed, as an editor shows them
//!
//! # Pipeline
//!
//! ```text
//! collect_source_files -> read_sources -> Scanner::process_batch
//!     -> annotate_paths (rewrite doc blocks)
//!     -> build_graph + generate_mermaid_diagram
//! ```

pub mod annotate;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod error_codes;
pub mod filter;
pub mod graph;
pub mod ingest;
pub mod output;
pub mod scan;
pub mod validation;

pub use annotate::{
    annotate_file, annotate_paths, create_doc_block, deduplicate_annotations,
    extract_usedby_entries, generate_usage_annotations, is_entry_point, process_doc_blocks,
    update_doc_block, write_if_changed, AnnotateOptions, AnnotateReport, AnnotationOptions,
    CommentStyle, DocBlockOptions,
};
pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticStage, SkipReason};
pub use error::{Result, UsedByError};
pub use filter::{collect_source_files, FileFilter};
pub use graph::{
    build_graph, build_symbol_graph, generate_mermaid_diagram, sanitize_id, DiagramOptions,
    DiagramType, Direction, GraphOptions, RelationshipGraph,
};
pub use ingest::detect::{detect_language, Language};
pub use ingest::{Extractor, Position, Range, Symbol, SymbolKind, Usage, UsageKind};
pub use output::{load_scan_result, save_scan_result, OutputFormat};
pub use scan::{scan_paths, ScanDepth, ScanOptions, ScanResult, Scanner, SourceFile};
pub use validation::{
    canonicalize_path, normalize_path, relative_path, validate_path_within_root,
    PathValidationError,
};
