//! `usedby.json` project configuration.
//!
//! Every field is optional; command-line flags override loaded values.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::annotate::{AnnotateOptions, AnnotationOptions, DocBlockOptions};
use crate::error::{Result, UsedByError};
use crate::graph::{DiagramOptions, DiagramType, Direction, GraphOptions, DEFAULT_MAX_NODES};
use crate::scan::{ScanDepth, ScanOptions, DEFAULT_BATCH_SIZE};

/// Config file name looked up in the scan root.
pub const CONFIG_FILE_NAME: &str = "usedby.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Glob patterns a file must match (any)
    pub include: Vec<String>,
    /// Glob patterns that exclude a file
    pub exclude: Vec<String>,
    pub scan_depth: ScanDepth,
    pub group_usages_by_file: bool,
    pub skip_entry_points: bool,
    pub include_diagrams: bool,
    pub diagram_type: DiagramType,
    pub direction: Direction,
    pub max_nodes: usize,
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            scan_depth: ScanDepth::Deep,
            group_usages_by_file: true,
            skip_entry_points: true,
            include_diagrams: false,
            diagram_type: DiagramType::Graph,
            direction: Direction::TD,
            max_nodes: DEFAULT_MAX_NODES,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Load `<root>/usedby.json`, or the defaults when it does not exist.
    ///
    /// An unreadable or invalid file is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path_in(root);
        if !path.exists() {
            debug!("no {} in {}, using defaults", CONFIG_FILE_NAME, root.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| UsedByError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Config = serde_json::from_str(&text)?;
        debug!("loaded {}", path.display());
        Ok(config)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            depth: self.scan_depth,
            batch_size: self.batch_size.max(1),
        }
    }

    pub fn graph_options(&self, root: Option<&Path>) -> GraphOptions {
        GraphOptions {
            max_nodes: self.max_nodes,
            group_by_file: self.group_usages_by_file,
            include_files: true,
            root: root.map(Path::to_path_buf),
        }
    }

    pub fn diagram_options(&self) -> DiagramOptions {
        DiagramOptions {
            diagram_type: self.diagram_type,
            direction: self.direction,
            show_labels: false,
        }
    }

    pub fn annotate_options(&self, root: Option<&Path>) -> AnnotateOptions {
        AnnotateOptions {
            annotations: AnnotationOptions {
                group_by_file: self.group_usages_by_file,
                skip_entry_points: self.skip_entry_points,
                root: root.map(Path::to_path_buf),
            },
            doc_block: DocBlockOptions {
                group_by_file: self.group_usages_by_file,
                include_diagram: self.include_diagrams,
                graph: self.graph_options(root),
                diagram: self.diagram_options(),
            },
        }
    }
}
