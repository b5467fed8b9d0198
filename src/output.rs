//! Persisted scan results and command output.
//!
//! A scan result is stored as pretty JSON:
//! `{symbols, scanTime, filesScanned, symbolsFound, usagesFound}` with every
//! symbol carrying its usages inline.

use std::path::Path;

use serde::Serialize;

use crate::error::{Result, UsedByError};
use crate::scan::ScanResult;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Human,
    /// JSON output
    Json,
}

impl OutputFormat {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Some(OutputFormat::Human),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Write `result` to `path` as pretty JSON.
pub fn save_scan_result(path: &Path, result: &ScanResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_error(path, e))?;
    }
    std::fs::write(path, json + "\n").map_err(|e| write_error(path, e))
}

fn write_error(path: &Path, err: std::io::Error) -> UsedByError {
    UsedByError::FileWrite {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Read a scan result written by [`save_scan_result`].
pub fn load_scan_result(path: &Path) -> Result<ScanResult> {
    if !path.exists() {
        return Err(UsedByError::InputNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|e| UsedByError::FileRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Print `data` as pretty JSON on stdout.
pub fn output_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{}", json);
    Ok(())
}
