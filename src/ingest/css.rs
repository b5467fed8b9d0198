//! Stylesheet extraction for CSS, SCSS and LESS.
//!
//! Selectors come from a small brace lexer that tracks at-rule context;
//! custom properties and SCSS variables come from line patterns.

use std::collections::HashSet;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::source::{extract_doc_comment, CommentSyntax, SourceText};
use super::{Extractor, Language, Symbol, SymbolKind, Usage, UsageCollector, UsageKind};
use crate::error::UsedByError;

/// Custom property declaration (`--name:`)
static CUSTOM_PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(--[A-Za-z0-9_-]+)\s*:").unwrap());

/// SCSS variable declaration at the start of a line (`$name:`)
static SCSS_VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(\$[A-Za-z_][A-Za-z0-9_-]*)\s*:").unwrap());

static EXTEND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@extend\s+([^;{}\n]+)").unwrap());

/// Markup attributes carrying class names or ids
static MARKUP_ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(class|className|id)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// At-rules whose block holds ordinary rules.
const RULE_BLOCK_AT_RULES: &[&str] = &["media", "supports", "layer", "container", "document", "scope"];

/// Extractor for stylesheet languages.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssExtractor;

/// Class or id a selector targets, used to find it in scripts and markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorKey {
    Class(String),
    Id(String),
}

impl SelectorKey {
    pub fn name(&self) -> &str {
        match self {
            SelectorKey::Class(name) | SelectorKey::Id(name) => name,
        }
    }

    /// The key as written in a selector: `.name` or `#name`.
    pub fn token(&self) -> String {
        match self {
            SelectorKey::Class(name) => format!(".{}", name),
            SelectorKey::Id(name) => format!("#{}", name),
        }
    }
}

/// Last `.class` or `#id` token of a selector outside brackets and parentheses.
///
/// `.card .title:hover` yields `Class("title")`; `a[href$=".pdf"]` yields
/// `None`.
pub fn selector_key(selector: &str) -> Option<SelectorKey> {
    let chars: Vec<(usize, char)> = selector.char_indices().collect();
    let mut depth = 0usize;
    let mut key = None;
    let mut i = 0;
    while i < chars.len() {
        let (_, c) = chars[i];
        match c {
            '\\' => {
                i += 2;
                continue;
            }
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '.' | '#' if depth == 0 => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_css_ident_char(chars[end].1) {
                    end += 1;
                }
                let first = chars.get(start).map(|(_, c)| *c);
                if end > start && !first.is_some_and(|c| c.is_ascii_digit()) {
                    let name: String = chars[start..end].iter().map(|(_, c)| c).collect();
                    key = Some(if c == '.' {
                        SelectorKey::Class(name)
                    } else {
                        SelectorKey::Id(name)
                    });
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    key
}

pub(crate) fn is_css_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Byte offsets of `token` in `text` bounded by non-identifier characters.
///
/// Tokens starting with `.` or `#` only need a boundary after them, so
/// `div.card` matches `.card`.
pub(crate) fn css_occurrences<'t>(text: &'t str, token: &'t str) -> impl Iterator<Item = usize> + 't {
    text.match_indices(token).filter_map(move |(idx, _)| {
        if token.is_empty() {
            return None;
        }
        let leading = token.starts_with(['.', '#']);
        let before_ok = leading
            || text[..idx]
                .chars()
                .next_back()
                .map_or(true, |c| !is_css_ident_char(c) && c != '$');
        let after_ok = text[idx + token.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_css_ident_char(c));
        (before_ok && after_ok).then_some(idx)
    })
}

/// Push a reference for every markup attribute naming `key`.
///
/// Matches `class="a b"`, `className='a'` and `id="x"` anywhere in the text,
/// including inside string literals and template strings.
pub(crate) fn push_markup_references(
    collector: &mut UsageCollector<'_, '_>,
    source: &SourceText<'_>,
    key: &SelectorKey,
) {
    for caps in MARKUP_ATTRIBUTE_RE.captures_iter(source.text()) {
        let Some(value) = caps.get(2).or_else(|| caps.get(3)) else {
            continue;
        };
        let is_id = &caps[1] == "id";
        match key {
            SelectorKey::Id(id) if is_id => {
                let trimmed = value.as_str().trim();
                if trimmed == id {
                    let start = value.start() + value.as_str().find(trimmed).unwrap_or(0);
                    collector.push(start, start + trimmed.len(), UsageKind::Reference);
                }
            }
            SelectorKey::Class(class) if !is_id => {
                if let Some(offset) = class_token_offset(value.as_str(), class) {
                    let start = value.start() + offset;
                    collector.push(start, start + class.len(), UsageKind::Reference);
                }
            }
            _ => {}
        }
    }
}

/// Offset of `class` as a whitespace-separated token of `list`.
pub(crate) fn class_token_offset(list: &str, class: &str) -> Option<usize> {
    let base = list.as_ptr() as usize;
    list.split_whitespace()
        .find(|token| *token == class)
        .map(|token| token.as_ptr() as usize - base)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    /// Ordinary rule; nested rules (SCSS) are scanned
    Rule,
    /// `@media` and friends; contents are rules
    AtBlock,
    /// Any other at-rule block (`@keyframes`, `@font-face`, mixins)
    Skip,
}

fn classify_prelude(prelude: &str) -> Block {
    let trimmed = prelude.trim();
    match trimmed.strip_prefix('@') {
        Some(rest) => {
            let name: String = rest.chars().take_while(|c| is_css_ident_char(*c)).collect();
            if RULE_BLOCK_AT_RULES.contains(&name.to_ascii_lowercase().as_str()) {
                Block::AtBlock
            } else {
                Block::Skip
            }
        }
        None => Block::Rule,
    }
}

/// Split a selector list on top-level commas, keeping each part's offset.
pub(crate) fn split_selector_list(prelude: &str) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in prelude.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push((start, &prelude[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push((start, &prelude[start..]));
    parts
}

impl CssExtractor {
    fn collect_selectors(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        seen: &mut HashSet<String>,
        symbols: &mut Vec<Symbol>,
    ) {
        let content = source.text();
        let bytes = content.as_bytes();
        let mut stack: Vec<Block> = Vec::new();
        let mut prelude_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if let Some(end) = source.comment_end(i) {
                if content[prelude_start..i].trim().is_empty() {
                    prelude_start = end;
                }
                i = end;
                continue;
            }
            if let Some(end) = source.string_end(i) {
                i = end;
                continue;
            }
            match bytes[i] {
                b'{' if i > 0 && bytes[i - 1] == b'#' => {
                    // SCSS interpolation
                    match source.matching_brace(i) {
                        Some(close) => {
                            i = close + 1;
                            continue;
                        }
                        None => {
                            debug!("{}: unterminated interpolation, stopping selector scan", file_path);
                            return;
                        }
                    }
                }
                b'{' => {
                    let prelude = &content[prelude_start..i];
                    let block = match stack.last() {
                        Some(Block::Skip) => Block::Skip,
                        _ => classify_prelude(prelude),
                    };
                    if block == Block::Rule {
                        let Some(close) = source.matching_brace(i) else {
                            let error = UsedByError::ParseAmbiguity {
                                path: file_path.to_string(),
                                line: source.line_of(i) + 1,
                            };
                            debug!("[{}] {}; stopping selector scan", error.code(), error);
                            return;
                        };
                        self.emit_selectors(source, file_path, prelude, prelude_start, close, seen, symbols);
                    }
                    stack.push(block);
                    prelude_start = i + 1;
                }
                b'}' => {
                    stack.pop();
                    prelude_start = i + 1;
                }
                b';' => prelude_start = i + 1,
                _ => {}
            }
            i += 1;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_selectors(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        prelude: &str,
        prelude_start: usize,
        close: usize,
        seen: &mut HashSet<String>,
        symbols: &mut Vec<Symbol>,
    ) {
        for (offset, part) in split_selector_list(prelude) {
            let name = part.split_whitespace().collect::<Vec<_>>().join(" ");
            if name.is_empty() || name.contains('&') || selector_key(&name).is_none() {
                continue;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            let leading = part.len() - part.trim_start().len();
            let start = prelude_start + offset + leading;
            let position = source.position_at(start);
            let range = source.range(start, close + 1);
            symbols.push(
                Symbol::new(name, SymbolKind::Selector, file_path, position, range)
                    .with_documentation(extract_doc_comment(source, position.line)),
            );
        }
    }

    fn collect_variables(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        seen: &mut HashSet<String>,
        symbols: &mut Vec<Symbol>,
    ) {
        let content = source.text();

        for caps in CUSTOM_PROPERTY_RE.captures_iter(content) {
            let Some(name) = caps.get(1) else { continue };
            if source.in_comment(name.start()) {
                continue;
            }
            let before = source.before_on_line(name.start()).trim_end();
            if !(before.is_empty() || before.ends_with('{') || before.ends_with(';')) {
                continue;
            }
            self.push_variable(source, file_path, name.start(), name.as_str(), seen, symbols);
        }

        let mut depth = source.depth_tracker(0);
        for caps in SCSS_VARIABLE_RE.captures_iter(content) {
            let Some(name) = caps.get(1) else { continue };
            if depth.advance_to(name.start()) != 0 || source.in_comment(name.start()) {
                continue;
            }
            self.push_variable(source, file_path, name.start(), name.as_str(), seen, symbols);
        }
    }

    fn push_variable(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        start: usize,
        name: &str,
        seen: &mut HashSet<String>,
        symbols: &mut Vec<Symbol>,
    ) {
        if !seen.insert(name.to_string()) {
            return;
        }
        let position = source.position_at(start);
        symbols.push(
            Symbol::new(
                name,
                SymbolKind::Variable,
                file_path,
                position,
                source.range(start, start + name.len()),
            )
            .with_documentation(extract_doc_comment(source, position.line)),
        );
    }
}

impl Extractor for CssExtractor {
    fn language(&self) -> Language {
        Language::Css
    }

    fn comment_syntax(&self) -> CommentSyntax {
        CommentSyntax::CSS
    }

    fn parse_symbols(&self, content: &str, file_path: &str) -> Vec<Symbol> {
        let source = self.prepare(content);
        let mut seen = HashSet::new();
        let mut symbols = Vec::new();
        self.collect_selectors(&source, file_path, &mut seen, &mut symbols);
        self.collect_variables(&source, file_path, &mut seen, &mut symbols);
        symbols.sort_by_key(|s| s.position);
        symbols
    }

    fn find_usages_in(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        symbol: &Symbol,
    ) -> Vec<Usage> {
        let mut collector = UsageCollector::new(source, file_path, symbol);
        let content = source.text();

        match symbol.kind {
            SymbolKind::Selector => {
                if let Some(key) = selector_key(&symbol.name) {
                    let token = key.token();
                    for caps in EXTEND_RE.captures_iter(content) {
                        let Some(target) = caps.get(1) else { continue };
                        for idx in css_occurrences(target.as_str(), &token) {
                            let start = target.start() + idx;
                            collector.push(start, start + token.len(), UsageKind::Extend);
                        }
                    }
                }
            }
            SymbolKind::Variable => {
                for idx in css_occurrences(content, &symbol.name) {
                    let end = idx + symbol.name.len();
                    if source.after_on_line(end).trim_start().starts_with(':') {
                        // redeclaration
                        continue;
                    }
                    collector.push(idx, end, UsageKind::Reference);
                }
            }
            _ => {}
        }

        collector.finish()
    }
}
