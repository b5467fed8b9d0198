//! Doc-block synthesis and merging.
//!
//! Rewriting is a pure transformation `(content, symbol, annotations) ->
//! content`. The blocks directly above a definition are located by line
//! index ranges, parsed into parts, merged with the new `@usedby` entries
//! and replaced by one consolidated block. Running it twice with the same
//! inputs gives byte-identical output.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use super::style::CommentStyle;
use crate::error::UsedByError;
use crate::graph::{build_symbol_graph, generate_mermaid_diagram, DiagramOptions, GraphOptions};
use crate::ingest::css::{css_occurrences, split_selector_list};
use crate::ingest::detect::extension_of;
use crate::ingest::source::{contains_word, is_ident_char};
use crate::ingest::{Language, Symbol, SymbolKind};

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<path>.+?):(?P<lines>\d+(?:\s*,\s*\d+)*)(?:\s+\((?P<kind>[A-Za-z_]+)\))?$").unwrap()
});

const USEDBY_TAG: &str = "@usedby";
const FENCE_OPEN: &str = "```mermaid";
const FENCE_CLOSE: &str = "```";

/// One parsed `@usedby` entry: `<path>:<line,...> (<kind>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedByEntry {
    pub path: String,
    /// 1-indexed line numbers as written
    pub lines: Vec<usize>,
    pub kind: Option<String>,
}

impl UsedByEntry {
    pub fn parse(text: &str) -> Option<Self> {
        let caps = ENTRY_RE.captures(text.trim())?;
        let lines = caps["lines"]
            .split(',')
            .filter_map(|l| l.trim().parse().ok())
            .collect();
        Some(Self {
            path: caps["path"].to_string(),
            lines,
            kind: caps.name("kind").map(|k| k.as_str().to_string()),
        })
    }
}

impl std::fmt::Display for UsedByEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<String> = self.lines.iter().map(usize::to_string).collect();
        write!(f, "{}:{}", self.path, lines.join(","))?;
        if let Some(kind) = &self.kind {
            write!(f, " ({})", kind)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DocBlockOptions {
    /// Merge `@usedby` entries by target path rather than by exact text
    pub group_by_file: bool,
    /// Regenerate a fenced diagram inside the block
    pub include_diagram: bool,
    pub graph: GraphOptions,
    pub diagram: DiagramOptions,
}

impl Default for DocBlockOptions {
    fn default() -> Self {
        Self {
            group_by_file: true,
            include_diagram: false,
            graph: GraphOptions::default(),
            diagram: DiagramOptions::default(),
        }
    }
}

/// Every `@usedby` entry in `text`, in order.
pub fn extract_usedby_entries(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let idx = line.find(USEDBY_TAG)?;
            let rest = line[idx + USEDBY_TAG.len()..].trim();
            let rest = rest.strip_suffix("*/").unwrap_or(rest).trim();
            (!rest.is_empty()).then(|| rest.to_string())
        })
        .collect()
}

/// One entry per target path, sorted by path.
///
/// Among entries for the same path the one listing more line numbers is
/// kept; on a tie the later one wins. Entries that do not parse are kept
/// once each, after the parsed ones.
pub fn deduplicate_annotations(annotations: &[String]) -> Vec<String> {
    let mut by_path: BTreeMap<String, (usize, String)> = BTreeMap::new();
    let mut unparsed: Vec<String> = Vec::new();

    for annotation in annotations {
        let text = annotation.trim();
        if text.is_empty() {
            continue;
        }
        match UsedByEntry::parse(text) {
            Some(entry) => {
                let count = entry.lines.len();
                let keep_existing = by_path
                    .get(&entry.path)
                    .is_some_and(|(existing, _)| *existing > count);
                if !keep_existing {
                    by_path.insert(entry.path, (count, text.to_string()));
                }
            }
            None => {
                if !unparsed.iter().any(|u| u == text) {
                    unparsed.push(text.to_string());
                }
            }
        }
    }

    by_path.into_values().map(|(_, text)| text).chain(unparsed).collect()
}

/// Exact-text union, ordered by path then first line.
fn merge_exact(annotations: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = annotations
        .iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    merged.sort_by_cached_key(|a| match UsedByEntry::parse(a) {
        Some(entry) => (0, entry.path, entry.lines.first().copied().unwrap_or(0), a.clone()),
        None => (1, String::new(), 0, a.clone()),
    });
    merged.dedup();
    merged
}

/// Contents of one or more adjacent blocks.
#[derive(Debug, Default, PartialEq, Eq)]
struct BlockParts {
    description: Vec<String>,
    tags: Vec<String>,
    usedby: Vec<String>,
    diagram: Option<Vec<String>>,
}

/// Text of a block line without its delimiters and ` * ` prefix.
///
/// Indentation after the prefix is kept so fenced diagrams survive.
fn inner_text(line: &str) -> &str {
    let mut text = line.trim_start();
    if let Some(rest) = text.strip_prefix("/**") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("/*") {
        text = rest;
    } else if !text.starts_with("*/") {
        if let Some(rest) = text.strip_prefix('*') {
            text = rest;
        }
    }
    let text = text.trim_end();
    let text = text.strip_suffix("*/").unwrap_or(text);
    let text = text.strip_prefix(' ').unwrap_or(text);
    text.trim_end()
}

fn trim_blank_edges(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);
}

/// `blocks` holds each block's lines with comment delimiters stripped.
fn parse_blocks(blocks: &[Vec<&str>]) -> BlockParts {
    let mut parts = BlockParts::default();

    for block in blocks {
        let mut description = Vec::new();
        let mut in_tags = false;
        let mut fence: Option<Vec<String>> = None;

        for &text in block {
            if let Some(diagram) = fence.as_mut() {
                if text.trim() == FENCE_CLOSE {
                    if parts.diagram.is_none() {
                        parts.diagram = fence.take();
                    } else {
                        fence = None;
                    }
                } else {
                    diagram.push(text.to_string());
                }
                continue;
            }

            let trimmed = text.trim_start();
            if trimmed.starts_with(FENCE_OPEN) {
                fence = Some(Vec::new());
            } else if let Some(rest) = trimmed.strip_prefix(USEDBY_TAG) {
                let entry = rest.trim();
                if !entry.is_empty() {
                    parts.usedby.push(entry.to_string());
                }
                in_tags = true;
            } else if trimmed.starts_with('@') {
                parts.tags.push(text.to_string());
                in_tags = true;
            } else if in_tags {
                if !text.is_empty() {
                    parts.tags.push(text.to_string());
                }
            } else {
                description.push(text.to_string());
            }
        }

        // unterminated fence: keep what was collected
        if let Some(diagram) = fence {
            if parts.diagram.is_none() {
                parts.diagram = Some(diagram);
            }
        }

        trim_blank_edges(&mut description);
        if !description.is_empty() {
            if !parts.description.is_empty() {
                parts.description.push(String::new());
            }
            parts.description.extend(description);
        }
    }
    parts
}

fn render_block(parts: &BlockParts, style: &CommentStyle, indent: &str, newline: &str) -> String {
    let mut lines = vec![style.block_start.to_string()];
    lines.extend(parts.description.iter().map(|d| style.inner_line(d)));
    if !parts.description.is_empty() && !(parts.tags.is_empty() && parts.usedby.is_empty()) {
        lines.push(style.inner_line(""));
    }
    lines.extend(parts.tags.iter().map(|t| style.inner_line(t)));
    lines.extend(
        parts
            .usedby
            .iter()
            .map(|u| style.inner_line(&format!("{} {}", USEDBY_TAG, u))),
    );
    if let Some(diagram) = &parts.diagram {
        lines.push(style.inner_line(""));
        lines.push(style.inner_line(FENCE_OPEN));
        lines.extend(diagram.iter().map(|d| style.inner_line(d)));
        lines.push(style.inner_line(FENCE_CLOSE));
    }
    lines.push(style.block_end.to_string());

    let mut out = String::new();
    for line in lines {
        out.push_str(indent);
        out.push_str(&line);
        out.push_str(newline);
    }
    out
}

fn default_description(symbol: &Symbol) -> String {
    format!("{} {}", symbol.kind.label(), symbol.qualified_name())
}

fn symbol_diagram(symbol: &Symbol, options: &DocBlockOptions) -> Vec<String> {
    let graph = build_symbol_graph(symbol, &options.graph);
    generate_mermaid_diagram(&graph, &options.diagram)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Fresh doc block for `symbol`, every line newline-terminated.
pub fn create_doc_block(
    symbol: &Symbol,
    annotations: &[String],
    style: &CommentStyle,
    options: &DocBlockOptions,
) -> String {
    let parts = BlockParts {
        description: vec![default_description(symbol)],
        tags: Vec::new(),
        usedby: annotations.to_vec(),
        diagram: options.include_diagram.then(|| symbol_diagram(symbol, options)),
    };
    render_block(&parts, style, "", "\n")
}

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("/*") || trimmed.starts_with('*') || trimmed.starts_with("//")
}

/// Lines a selector prelude may span before its `{`.
const PRELUDE_LINES: usize = 16;

/// Whether a comma-separated part of a rule prelude starting on line `i`
/// equals `name` once whitespace is collapsed.
fn selector_starts_on(lines: &[&str], i: usize, name: &str) -> bool {
    let end = (i + PRELUDE_LINES).min(lines.len());
    let text: String = lines[i..end].concat();
    let first_line = lines[i].len();

    let segment_starts = std::iter::once(0).chain(
        lines[i]
            .char_indices()
            .filter(|(_, c)| matches!(c, '{' | '}' | ';'))
            .map(|(idx, _)| idx + 1),
    );
    for start in segment_starts {
        let rest = &text[start..];
        let Some(cut) = rest.find(['{', '}', ';']) else { continue };
        if !rest[cut..].starts_with('{') {
            continue;
        }
        let prelude = &rest[..cut];
        for (offset, part) in split_selector_list(prelude) {
            let leading = part.len() - part.trim_start().len();
            if start + offset + leading >= first_line {
                continue;
            }
            if part.split_whitespace().collect::<Vec<_>>().join(" ") == name {
                return true;
            }
        }
    }
    false
}

/// `--name:` or `$name:` declared on `line`.
fn declares_variable(line: &str, name: &str) -> bool {
    css_occurrences(line, name).any(|idx| line[idx + name.len()..].trim_start().starts_with(':'))
}

fn quotes(line: &str, name: &str) -> bool {
    ['\'', '"', '`'].iter().any(|q| line.contains(&format!("{q}{name}{q}")))
}

/// Whether line `i` holds the definition of `symbol`.
fn defines(lines: &[&str], i: usize, symbol: &Symbol) -> bool {
    let name = symbol.name.as_str();
    if name.is_empty() || is_comment_line(lines[i].trim()) {
        return false;
    }
    match symbol.kind {
        SymbolKind::Selector => selector_starts_on(lines, i, name),
        SymbolKind::Variable if name.starts_with(['-', '$']) => declares_variable(lines[i], name),
        SymbolKind::Event => quotes(lines[i], name),
        _ if name.chars().all(is_ident_char) => contains_word(lines[i], name),
        _ => lines[i].contains(name),
    }
}

/// Definition line: the recorded one when it still defines the symbol, else
/// the nearest line that does.
fn find_definition_line(lines: &[&str], symbol: &Symbol) -> Option<usize> {
    let count = lines.len();
    let matches = |i: usize| i < count && defines(lines, i, symbol);
    let recorded = symbol.position.line;
    if matches(recorded) {
        return Some(recorded);
    }
    for distance in 1..=recorded.max(count) {
        // insertions above push definitions down, so look below first
        if matches(recorded + distance) {
            return Some(recorded + distance);
        }
        if distance <= recorded && matches(recorded - distance) {
            return Some(recorded - distance);
        }
    }
    None
}

enum BlockStart {
    Line(usize),
    /// The `*/` closes a comment trailing code on the same line
    Trailing,
    Unmatched,
}

fn find_block_start(lines: &[&str], close: usize) -> BlockStart {
    let mut i = close;
    loop {
        let text = lines[i].trim();
        if text.contains("/*") {
            if text.starts_with("/*") {
                return BlockStart::Line(i);
            }
            return if i == close {
                BlockStart::Trailing
            } else {
                BlockStart::Unmatched
            };
        }
        if i != close && text.contains("*/") {
            return BlockStart::Unmatched;
        }
        if i == 0 {
            return BlockStart::Unmatched;
        }
        i -= 1;
    }
}

/// Line range of one comment block above a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockSpan {
    start: usize,
    end: usize,
    /// A run of `//` (or PHP `#`) lines rather than a `/* */` block
    line_comments: bool,
}

enum BlockScan {
    /// Adjacent blocks, top to bottom
    Found(Vec<BlockSpan>),
    Missing,
    /// Line of the delimiter without its partner
    Malformed(usize),
}

/// Body of a comment-only line starting with `//`, or `#` when
/// `hash_comments` is set (PHP). `#[` opens an attribute, not a comment.
fn line_comment_body(line: &str, hash_comments: bool) -> Option<&str> {
    let trimmed = line.trim();
    let body = match trimmed.strip_prefix("//") {
        Some(rest) => rest.trim_start_matches('/'),
        None if hash_comments && !trimmed.starts_with("#[") => trimmed.strip_prefix('#')?,
        None => return None,
    };
    Some(body.strip_prefix(' ').unwrap_or(body).trim_end())
}

fn scan_blocks_above(lines: &[&str], definition: usize, hash_comments: bool) -> BlockScan {
    let mut blocks = Vec::new();
    let mut end = definition;

    while end > 0 {
        if line_comment_body(lines[end - 1], hash_comments).is_some() {
            let mut start = end - 1;
            while start > 0 && line_comment_body(lines[start - 1], hash_comments).is_some() {
                start -= 1;
            }
            blocks.insert(0, BlockSpan { start, end, line_comments: true });
            end = start;
            continue;
        }
        let last = lines[end - 1].trim();
        if !last.ends_with("*/") {
            if blocks.is_empty() && last.starts_with("/*") {
                return BlockScan::Malformed(end - 1);
            }
            break;
        }
        match find_block_start(lines, end - 1) {
            BlockStart::Line(start) => {
                blocks.insert(0, BlockSpan { start, end, line_comments: false });
                end = start;
            }
            BlockStart::Trailing => break,
            BlockStart::Unmatched => {
                if blocks.is_empty() {
                    return BlockScan::Malformed(end - 1);
                }
                break;
            }
        }
    }

    if blocks.is_empty() {
        BlockScan::Missing
    } else {
        BlockScan::Found(blocks)
    }
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Merge `annotations` into the doc block(s) above `symbol`'s definition.
///
/// Existing description, other tags and (unless regenerated) the diagram
/// are kept; `@usedby` entries are merged by path when grouping, by exact
/// text otherwise. Without an existing block a fresh one is inserted above
/// the definition; a malformed block is left untouched and the fresh block
/// goes between it and the definition.
pub fn process_doc_blocks(
    content: &str,
    symbol: &Symbol,
    annotations: &[String],
    style: &CommentStyle,
    options: &DocBlockOptions,
) -> String {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };

    let Some(definition) = find_definition_line(&lines, symbol) else {
        warn!(
            "{}: definition of {} not found, leaving file as is",
            symbol.file_path, symbol.name
        );
        return content.to_string();
    };
    let indent = leading_whitespace(lines[definition]);

    let hash_comments = extension_of(&symbol.file_path)
        .and_then(|ext| Language::from_extension(&ext))
        == Some(Language::Php);

    let (start, mut parts) = match scan_blocks_above(&lines, definition, hash_comments) {
        BlockScan::Found(blocks) => {
            let texts: Vec<Vec<&str>> = blocks
                .iter()
                .map(|span| {
                    lines[span.start..span.end]
                        .iter()
                        .map(|line| {
                            if span.line_comments {
                                line_comment_body(line, hash_comments).unwrap_or_default()
                            } else {
                                inner_text(line)
                            }
                        })
                        .collect()
                })
                .collect();
            (blocks[0].start, parse_blocks(&texts))
        }
        BlockScan::Missing => {
            if annotations.is_empty() {
                return content.to_string();
            }
            (definition, BlockParts::default())
        }
        BlockScan::Malformed(line) => {
            let error = UsedByError::MalformedDocBlock {
                path: symbol.file_path.clone(),
                symbol: symbol.name.clone(),
                line: line + 1,
            };
            warn!("[{}] {}; adding a new block below it", error.code(), error);
            (definition, BlockParts::default())
        }
    };

    if parts.description.is_empty() {
        parts.description.push(default_description(symbol));
    }
    let mut entries = std::mem::take(&mut parts.usedby);
    entries.extend(annotations.iter().cloned());
    parts.usedby = if options.group_by_file {
        deduplicate_annotations(&entries)
    } else {
        merge_exact(&entries)
    };
    if options.include_diagram {
        parts.diagram = Some(symbol_diagram(symbol, options));
    }

    let mut out = String::with_capacity(content.len() + 256);
    for line in &lines[..start] {
        out.push_str(line);
    }
    out.push_str(&render_block(&parts, style, indent, newline));
    for line in &lines[definition..] {
        out.push_str(line);
    }
    out
}

/// Alias of [`process_doc_blocks`].
pub fn update_doc_block(
    content: &str,
    symbol: &Symbol,
    annotations: &[String],
    style: &CommentStyle,
    options: &DocBlockOptions,
) -> String {
    process_doc_blocks(content, symbol, annotations, style, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{CssExtractor, Extractor, Position, Range, Usage, UsageKind};

    fn symbol(name: &str, kind: SymbolKind, file: &str, line: usize) -> Symbol {
        let position = Position::new(line, 0);
        Symbol::new(name, kind, file, position, Range { start: position, end: position })
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn css_symbol(css: &str, name: &str) -> Symbol {
        CssExtractor
            .parse_symbols(css, "style.css")
            .into_iter()
            .find(|s| s.name == name)
            .unwrap()
    }

    /// Output of two consecutive runs, asserting they agree.
    fn process_twice(content: &str, symbol: &Symbol, annotations: &[&str]) -> String {
        let annotations = strings(annotations);
        let options = DocBlockOptions::default();
        let once = process_doc_blocks(content, symbol, &annotations, &CommentStyle::DOCBLOCK, &options);
        let twice = process_doc_blocks(&once, symbol, &annotations, &CommentStyle::DOCBLOCK, &options);
        assert_eq!(once, twice);
        once
    }

    #[test]
    fn test_parse_entry() {
        let entry = UsedByEntry::parse("src/cart.php:5,22 (call)").unwrap();
        assert_eq!(entry.path, "src/cart.php");
        assert_eq!(entry.lines, vec![5, 22]);
        assert_eq!(entry.kind.as_deref(), Some("call"));
        assert_eq!(entry.to_string(), "src/cart.php:5,22 (call)");

        let bare = UsedByEntry::parse("C:/proj/a.js:3").unwrap();
        assert_eq!(bare.path, "C:/proj/a.js");
        assert_eq!(bare.kind, None);
        assert!(UsedByEntry::parse("see other docs").is_none());
    }

    #[test]
    fn test_deduplicate_keeps_more_lines() {
        let deduped = deduplicate_annotations(&strings(&[
            "b.js:3,9 (call)",
            "a.js:1 (reference)",
            "b.js:3 (call)",
        ]));
        assert_eq!(deduped, strings(&["a.js:1 (reference)", "b.js:3,9 (call)"]));
    }

    #[test]
    fn test_deduplicate_tie_later_wins() {
        let deduped = deduplicate_annotations(&strings(&["a.js:3 (reference)", "a.js:4 (call)"]));
        assert_eq!(deduped, strings(&["a.js:4 (call)"]));
    }

    #[test]
    fn test_extract_usedby_entries() {
        let text = "/**\n * Class Foo\n *\n * @usedby a.php:1 (call)\n * @usedby b.php:2,3 (extend) */\n";
        assert_eq!(
            extract_usedby_entries(text),
            strings(&["a.php:1 (call)", "b.php:2,3 (extend)"])
        );
    }

    #[test]
    fn test_create_doc_block_layout() {
        let foo = symbol("Foo", SymbolKind::Class, "payments.php", 9);
        let block = create_doc_block(
            &foo,
            &strings(&["cart.php:5,22 (call)"]),
            &CommentStyle::DOCBLOCK,
            &DocBlockOptions::default(),
        );
        assert_eq!(block, "/**\n * Class Foo\n *\n * @usedby cart.php:5,22 (call)\n */\n");
    }

    #[test]
    fn test_create_doc_block_with_diagram() {
        let mut foo = symbol("init", SymbolKind::Function, "lib.js", 0);
        let position = Position::new(2, 0);
        foo.usages.push(Usage {
            file_path: "app.js".into(),
            position,
            range: Range { start: position, end: position },
            context: "init();".into(),
            kind: UsageKind::Call,
        });
        let options = DocBlockOptions {
            include_diagram: true,
            ..DocBlockOptions::default()
        };
        let block = create_doc_block(&foo, &strings(&["app.js:3 (call)"]), &CommentStyle::DOCBLOCK, &options);
        let expected = [
            "/**",
            " * Function init",
            " *",
            " * @usedby app.js:3 (call)",
            " *",
            " * ```mermaid",
            " * graph TD",
            " *     init(\"init\")",
            " *     file_app_js[[\"app.js\"]]",
            " *     file_app_js --> init",
            " * ```",
            " */",
            "",
        ]
        .join("\n");
        assert_eq!(block, expected);
    }

    #[test]
    fn test_inner_text() {
        assert_eq!(inner_text("/**"), "");
        assert_eq!(inner_text("   * Class Foo"), "Class Foo");
        assert_eq!(inner_text(" */"), "");
        assert_eq!(inner_text("/** one liner */"), "one liner");
        assert_eq!(inner_text(" *     Foo --> bar"), "    Foo --> bar");
    }

    #[test]
    fn test_insert_fresh_block_indented() {
        let content = "<?php\nclass Cart {\n    public function add() {}\n}\n";
        let add = symbol("add", SymbolKind::Method, "cart.php", 2).with_container(Some("Cart".into()));
        let out = process_doc_blocks(
            content,
            &add,
            &strings(&["shop.php:4 (call)"]),
            &CommentStyle::DOCBLOCK,
            &DocBlockOptions::default(),
        );
        assert_eq!(
            out,
            "<?php\nclass Cart {\n    /**\n     * Method Cart::add\n     *\n     * @usedby shop.php:4 (call)\n     */\n    public function add() {}\n}\n"
        );
    }

    #[test]
    fn test_merge_preserves_description_and_tags() {
        let content = "/**\n * Adds an item.\n *\n * @param int $qty\n */\nfunction add_item($qty) {}\n";
        let f = symbol("add_item", SymbolKind::Function, "cart.php", 5);
        let out = process_doc_blocks(
            content,
            &f,
            &strings(&["shop.php:4 (call)"]),
            &CommentStyle::DOCBLOCK,
            &DocBlockOptions::default(),
        );
        assert_eq!(
            out,
            "/**\n * Adds an item.\n *\n * @param int $qty\n * @usedby shop.php:4 (call)\n */\nfunction add_item($qty) {}\n"
        );
    }

    #[test]
    fn test_adjacent_blocks_consolidated() {
        let content = "/* Helper. */\n/**\n * @usedby a.js:1 (call)\n */\nfunction helper() {}\n";
        let f = symbol("helper", SymbolKind::Function, "lib.js", 4);
        let out = process_doc_blocks(
            content,
            &f,
            &strings(&["b.js:2 (call)"]),
            &CommentStyle::DOCBLOCK,
            &DocBlockOptions::default(),
        );
        assert_eq!(
            out,
            "/**\n * Helper.\n *\n * @usedby a.js:1 (call)\n * @usedby b.js:2 (call)\n */\nfunction helper() {}\n"
        );
    }

    #[test]
    fn test_process_is_idempotent_with_shifted_position() {
        let content = "function helper() {}\n";
        let f = symbol("helper", SymbolKind::Function, "lib.js", 0);
        let annotations = strings(&["b.js:2 (call)"]);
        let options = DocBlockOptions {
            include_diagram: true,
            ..DocBlockOptions::default()
        };
        let once = process_doc_blocks(content, &f, &annotations, &CommentStyle::DOCBLOCK, &options);
        let twice = process_doc_blocks(&once, &f, &annotations, &CommentStyle::DOCBLOCK, &options);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_existing_entry_not_duplicated() {
        let content = "/**\n * Function helper\n *\n * @usedby other.js:3 (call)\n */\nfunction helper() {}\n";
        let f = symbol("helper", SymbolKind::Function, "lib.js", 5);
        let out = process_doc_blocks(
            content,
            &f,
            &strings(&["other.js:3 (call)"]),
            &CommentStyle::DOCBLOCK,
            &DocBlockOptions::default(),
        );
        assert_eq!(out, content);
    }

    #[test]
    fn test_malformed_block_left_untouched() {
        let content = "x = 1;\n * stray text\n */\nfunction helper() {}\n";
        let f = symbol("helper", SymbolKind::Function, "lib.js", 3);
        let annotations = strings(&["b.js:2 (call)"]);
        let out = process_doc_blocks(content, &f, &annotations, &CommentStyle::DOCBLOCK, &DocBlockOptions::default());
        assert!(out.starts_with("x = 1;\n * stray text\n */\n/**\n * Function helper\n"));

        let again = process_doc_blocks(&out, &f, &annotations, &CommentStyle::DOCBLOCK, &DocBlockOptions::default());
        assert_eq!(out, again);
    }

    #[test]
    fn test_trailing_comment_is_not_a_block() {
        let content = "}\nfoo(); /* note */\nfunction helper() {}\n";
        let f = symbol("helper", SymbolKind::Function, "lib.js", 2);
        let out = process_doc_blocks(
            content,
            &f,
            &strings(&["b.js:2 (call)"]),
            &CommentStyle::DOCBLOCK,
            &DocBlockOptions::default(),
        );
        assert!(out.starts_with("}\nfoo(); /* note */\n/**\n"));
    }

    #[test]
    fn test_crlf_preserved() {
        let content = "<?php\r\nfunction pay() {}\r\n";
        let f = symbol("pay", SymbolKind::Function, "pay.php", 1);
        let out = process_doc_blocks(
            content,
            &f,
            &strings(&["cart.php:2 (call)"]),
            &CommentStyle::DOCBLOCK,
            &DocBlockOptions::default(),
        );
        assert_eq!(
            out,
            "<?php\r\n/**\r\n * Function pay\r\n *\r\n * @usedby cart.php:2 (call)\r\n */\r\nfunction pay() {}\r\n"
        );
    }

    #[test]
    fn test_ungrouped_merge_by_exact_text() {
        let content = "/**\n * @usedby a.js:10 (call)\n */\nfunction f() {}\n";
        let f = symbol("f", SymbolKind::Function, "lib.js", 3);
        let options = DocBlockOptions {
            group_by_file: false,
            ..DocBlockOptions::default()
        };
        let out = process_doc_blocks(
            content,
            &f,
            &strings(&["a.js:3 (call)", "a.js:10 (call)"]),
            &CommentStyle::DOCBLOCK,
            &options,
        );
        assert_eq!(extract_usedby_entries(&out), strings(&["a.js:3 (call)", "a.js:10 (call)"]));
    }

    #[test]
    fn test_custom_property_not_confused_with_longer_name() {
        let content = ":root {\n  --gap-large: 8px;\n  --gap: 4px;\n}\n";
        let gap = css_symbol(content, "--gap");
        assert_eq!(gap.position.line, 2);

        let out = process_twice(content, &gap, &["card.css:1 (reference)"]);
        assert_eq!(
            out,
            ":root {\n  --gap-large: 8px;\n  /**\n   * Variable --gap\n   *\n   * @usedby card.css:1 (reference)\n   */\n  --gap: 4px;\n}\n"
        );
    }

    #[test]
    fn test_selector_with_irregular_whitespace() {
        let content = "h1 {}\n.card  .title { color: red; }\n";
        let selector = css_symbol(content, ".card .title");

        let out = process_twice(content, &selector, &["app.js:2 (reference)"]);
        assert_eq!(
            out,
            "h1 {}\n/**\n * Selector .card .title\n *\n * @usedby app.js:2 (reference)\n */\n.card  .title { color: red; }\n"
        );
    }

    #[test]
    fn test_selector_spanning_lines() {
        let content = ".card\n  .title {\n  color: red;\n}\n";
        let selector = css_symbol(content, ".card .title");
        assert_eq!(selector.position.line, 0);

        let out = process_twice(content, &selector, &["app.js:2 (reference)"]);
        assert_eq!(
            out,
            "/**\n * Selector .card .title\n *\n * @usedby app.js:2 (reference)\n */\n.card\n  .title {\n  color: red;\n}\n"
        );
    }

    #[test]
    fn test_selector_later_in_comma_list() {
        let content = ".a,\n.card .title {\n  color: red;\n}\n";
        let selector = css_symbol(content, ".card .title");
        assert_eq!(selector.position.line, 1);

        let out = process_twice(content, &selector, &["app.js:2 (reference)"]);
        assert!(out.starts_with(".a,\n/**\n * Selector .card .title\n"));
    }

    #[test]
    fn test_line_comments_become_the_block() {
        let content = "// Helper for widgets.\n// Second line.\nfunction helper() {}\n";
        let f = symbol("helper", SymbolKind::Function, "lib.js", 2);

        let out = process_twice(content, &f, &["b.js:2 (call)"]);
        assert_eq!(
            out,
            "/**\n * Helper for widgets.\n * Second line.\n *\n * @usedby b.js:2 (call)\n */\nfunction helper() {}\n"
        );
    }

    #[test]
    fn test_php_hash_comments_and_attributes() {
        let f = symbol("pay", SymbolKind::Function, "pay.php", 2);
        let out = process_twice("<?php\n# Pays.\nfunction pay() {}\n", &f, &["cart.php:2 (call)"]);
        assert_eq!(
            out,
            "<?php\n/**\n * Pays.\n *\n * @usedby cart.php:2 (call)\n */\nfunction pay() {}\n"
        );

        let out = process_twice("<?php\n#[Pure]\nfunction pay() {}\n", &f, &["cart.php:2 (call)"]);
        assert!(out.starts_with("<?php\n#[Pure]\n/**\n * Function pay\n"));
    }

    #[test]
    fn test_line_comment_body() {
        assert_eq!(line_comment_body("  // note", false), Some("note"));
        assert_eq!(line_comment_body("/// doc", false), Some("doc"));
        assert_eq!(line_comment_body("# note", false), None);
        assert_eq!(line_comment_body("# note", true), Some("note"));
        assert_eq!(line_comment_body("#[Attr]", true), None);
        assert_eq!(line_comment_body("foo(); // trailing", false), None);
    }
}
