//! `@usedby` annotations and source rewriting.
//!
//! [`generate_usage_annotations`] turns a symbol's usages into annotation
//! strings, [`doc_block`] merges them into the comment above the definition
//! and [`writer`] puts the result back on disk.

pub mod doc_block;
pub mod style;
pub mod writer;

pub use doc_block::{
    create_doc_block, deduplicate_annotations, extract_usedby_entries, process_doc_blocks,
    update_doc_block, DocBlockOptions, UsedByEntry,
};
pub use style::CommentStyle;
pub use writer::{annotate_paths, write_if_changed, AnnotateReport};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::debug;

use crate::ingest::{Symbol, UsageKind};
use crate::validation::display_path;

#[derive(Debug, Clone)]
pub struct AnnotationOptions {
    /// One annotation per referencing file instead of one per usage
    pub group_by_file: bool,
    /// Leave out usages from entry-point files
    pub skip_entry_points: bool,
    /// Render paths relative to this directory
    pub root: Option<PathBuf>,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        Self {
            group_by_file: true,
            skip_entry_points: true,
            root: None,
        }
    }
}

/// Everything [`annotate_file`] needs.
#[derive(Debug, Clone, Default)]
pub struct AnnotateOptions {
    pub annotations: AnnotationOptions,
    pub doc_block: DocBlockOptions,
}

/// Annotation strings for `symbol`.
///
/// Grouped: `<path>:<l1>,<l2> (<kind>)` per file with 1-indexed, ascending,
/// deduplicated lines and the first usage's kind. Ungrouped: one
/// `<path>:<line> (<kind>)` per usage. The definition line itself and,
/// when requested, entry-point files are left out.
pub fn generate_usage_annotations(symbol: &Symbol, options: &AnnotationOptions) -> Vec<String> {
    let root = options.root.as_deref();
    let mut usages: Vec<(String, usize, UsageKind)> = symbol
        .usages
        .iter()
        .filter(|u| !symbol.is_definition_site(&u.file_path, u.position.line))
        .map(|u| (display_path(&u.file_path, root), u.position.line + 1, u.kind))
        .filter(|(path, _, _)| !(options.skip_entry_points && is_entry_point(path)))
        .collect();
    usages.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));

    if !options.group_by_file {
        let mut annotations: Vec<String> = usages
            .iter()
            .map(|(path, line, kind)| format!("{}:{} ({})", path, line, kind))
            .collect();
        annotations.dedup();
        return annotations;
    }

    let mut by_file: BTreeMap<&str, (UsageKind, BTreeSet<usize>)> = BTreeMap::new();
    for (path, line, kind) in &usages {
        by_file
            .entry(path.as_str())
            .or_insert_with(|| (*kind, BTreeSet::new()))
            .1
            .insert(*line);
    }
    by_file
        .into_iter()
        .map(|(path, (kind, lines))| {
            let lines: Vec<String> = lines.iter().map(usize::to_string).collect();
            format!("{}:{} ({})", path, lines.join(","), kind)
        })
        .collect()
}

fn normalized_stem(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether `path` looks like a module's main file.
///
/// True when the file stem equals the parent or grandparent directory name,
/// ignoring case, `-` and `_` (`plugins/cart/cart.php`,
/// `modules/cart-ui/src/cart_ui.js`).
pub fn is_entry_point(path: &str) -> bool {
    let path = Path::new(path);
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let stem = normalized_stem(stem);
    if stem.is_empty() {
        return false;
    }
    path.ancestors()
        .skip(1)
        .take(2)
        .filter_map(|dir| dir.file_name().and_then(|n| n.to_str()))
        .any(|dir| normalized_stem(dir) == stem)
}

/// Rewrite `content` so every symbol of `file_path` with annotations carries
/// an up-to-date doc block.
///
/// Symbols are processed bottom-up so insertions never shift a pending
/// definition. Symbols defined on the same line share one block.
pub fn annotate_file(content: &str, file_path: &str, symbols: &[Symbol], options: &AnnotateOptions) -> String {
    let Some(style) = CommentStyle::for_path(file_path) else {
        debug!("{}: no comment style, not annotating", file_path);
        return content.to_string();
    };

    let mut by_line: BTreeMap<usize, Vec<&Symbol>> = BTreeMap::new();
    for symbol in symbols.iter().filter(|s| s.file_path == file_path) {
        by_line.entry(symbol.position.line).or_default().push(symbol);
    }

    let mut content = content.to_string();
    for (_, mut group) in by_line.into_iter().rev() {
        group.sort_by_key(|s| s.position.character);
        let mut owner = group[0].clone();
        for other in &group[1..] {
            owner.usages.extend(other.usages.iter().cloned());
        }
        owner
            .usages
            .sort_by(|a, b| (&a.file_path, a.position).cmp(&(&b.file_path, b.position)));

        let annotations = generate_usage_annotations(&owner, &options.annotations);
        if annotations.is_empty() {
            continue;
        }
        content = process_doc_blocks(&content, &owner, &annotations, &style, &options.doc_block);
    }
    content
}

/// Whether any symbol of `file_path` would receive an annotation.
pub fn has_annotations(file_path: &str, symbols: &[Symbol], options: &AnnotationOptions) -> bool {
    symbols
        .iter()
        .filter(|s| s.file_path == file_path)
        .any(|s| !generate_usage_annotations(s, options).is_empty())
}
