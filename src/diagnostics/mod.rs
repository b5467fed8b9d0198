//! Structured diagnostics for scan and annotate runs.
//!
//! Per-file failures never abort a batch; they are collected here, sorted
//! deterministically and reported on stderr by the driver.

pub mod file_diagnostics;

pub use file_diagnostics::{Diagnostic, DiagnosticStage, SkipReason};
