//! PHP symbol extraction.
//!
//! Classes, methods, functions, constants and hook names are found with
//! line-anchored patterns; class bodies are delimited with the brace
//! matcher so methods get their container and are never mistaken for
//! top-level functions.

use std::collections::HashSet;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::css::{push_markup_references, selector_key};
use super::source::{extract_doc_comment, word_occurrences, CommentSyntax, SourceText};
use super::{
    base_name, ends_with_word, strip_qualifier, Extractor, Language, Symbol, SymbolKind, Usage,
    UsageCollector, UsageKind,
};
use crate::error::UsedByError;

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:abstract|final|readonly)\s+)*(?:class|interface|trait|enum)\s+([A-Za-z_]\w*)",
    )
    .unwrap()
});

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:public|protected|private|static|abstract|final)\s+)*function\s+&?([A-Za-z_]\w*)\s*\(",
    )
    .unwrap()
});

static FUNCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*function\s+&?([A-Za-z_]\w*)\s*\(").unwrap());

static DEFINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bdefine\s*\(\s*['"]([A-Za-z_]\w*)['"]"#).unwrap());

static CONST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*const\s+([A-Za-z_]\w*)\s*=").unwrap());

/// Hook names fired by `do_action` / `apply_filters`
static EVENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:do_action|apply_filters)\s*\(\s*['"]([^'"\n]+)['"]"#).unwrap()
});

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:require|include)(?:_once)?\b[^;\n]*?['"]([^'"\n]+)['"]"#).unwrap()
});

static IMPLEMENTS_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bimplements\s+[\w\\,\s]*$").unwrap());

static HOOK_FIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:do_action|do_action_ref_array|apply_filters)\s*\(\s*$").unwrap());

/// Extractor for PHP sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpExtractor;

impl PhpExtractor {
    /// Classes and their methods. Returns the byte spans of class bodies.
    fn collect_classes(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        symbols: &mut Vec<Symbol>,
    ) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = Vec::new();

        for caps in CLASS_RE.captures_iter(source.text()) {
            let Some(name) = caps.get(1) else { continue };
            if source.in_comment(name.start())
                || spans.iter().any(|&(s, e)| name.start() > s && name.start() < e)
            {
                continue;
            }
            let position = source.position_at(name.start());
            let open = source.find_block_open(name.end(), 0);
            let close = open.and_then(|o| source.matching_brace(o));

            let end = match (open, close) {
                (Some(o), Some(c)) => {
                    spans.push((o, c));
                    c + 1
                }
                (Some(o), None) => {
                    let error = UsedByError::ParseAmbiguity {
                        path: file_path.to_string(),
                        line: position.line + 1,
                    };
                    debug!("[{}] {}; members of {} skipped", error.code(), error, name.as_str());
                    // the unterminated body swallows the rest of the file
                    spans.push((o, source.len()));
                    name.end()
                }
                (None, _) => name.end(),
            };

            symbols.push(
                Symbol::new(
                    name.as_str(),
                    SymbolKind::Class,
                    file_path,
                    position,
                    source.range(name.start(), end),
                )
                .with_documentation(extract_doc_comment(source, position.line)),
            );

            if let (Some(o), Some(c)) = (open, close) {
                self.collect_methods(source, file_path, name.as_str(), o, c, symbols);
            }
        }

        spans
    }

    fn collect_methods(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        class_name: &str,
        open: usize,
        close: usize,
        symbols: &mut Vec<Symbol>,
    ) {
        let body_start = open + 1;
        let body = &source.text()[body_start..close];
        let mut depth = source.depth_tracker(body_start);

        for caps in METHOD_RE.captures_iter(body) {
            let Some(name) = caps.get(1) else { continue };
            let start = body_start + name.start();
            if depth.advance_to(start) != 0 || source.in_comment(start) {
                continue;
            }
            let after_paren = body_start + caps.get(0).map_or(name.end(), |m| m.end());
            let end = source
                .find_block_open(after_paren, 1)
                .and_then(|o| source.matching_brace(o))
                .map_or(start + name.len(), |c| c + 1);
            let position = source.position_at(start);

            symbols.push(
                Symbol::new(
                    name.as_str(),
                    SymbolKind::Method,
                    file_path,
                    position,
                    source.range(start, end),
                )
                .with_container(Some(class_name.to_string()))
                .with_documentation(extract_doc_comment(source, position.line)),
            );
        }
    }

    fn collect_functions(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        class_spans: &[(usize, usize)],
        symbols: &mut Vec<Symbol>,
    ) {
        let inside_class = |offset: usize| class_spans.iter().any(|&(s, e)| offset > s && offset < e);

        let mut found = Vec::new();
        for caps in FUNCTION_RE.captures_iter(source.text()) {
            let Some(name) = caps.get(1) else { continue };
            if inside_class(name.start()) || source.in_comment(name.start()) {
                continue;
            }
            let after_paren = caps.get(0).map_or(name.end(), |m| m.end());
            let end = source
                .find_block_open(after_paren, 1)
                .and_then(|o| source.matching_brace(o))
                .map_or(name.end(), |c| c + 1);
            found.push((name.start(), name.as_str(), end));
        }

        // declarations nested in another function body are not top-level
        for &(start, name, end) in &found {
            if found.iter().any(|&(s, _, e)| s < start && start < e) {
                continue;
            }
            let position = source.position_at(start);
            symbols.push(
                Symbol::new(name, SymbolKind::Function, file_path, position, source.range(start, end))
                    .with_documentation(extract_doc_comment(source, position.line)),
            );
        }

        let mut constants = HashSet::new();
        let defined = DEFINE_RE
            .captures_iter(source.text())
            .chain(CONST_RE.captures_iter(source.text()))
            .filter_map(|caps| caps.get(1));
        for name in defined {
            if inside_class(name.start()) || source.in_comment(name.start()) {
                continue;
            }
            if !constants.insert(name.as_str()) {
                continue;
            }
            let position = source.position_at(name.start());
            symbols.push(
                Symbol::new(
                    name.as_str(),
                    SymbolKind::Variable,
                    file_path,
                    position,
                    source.range(name.start(), name.end()),
                )
                .with_documentation(extract_doc_comment(source, position.line)),
            );
        }
    }

    fn collect_events(&self, source: &SourceText<'_>, file_path: &str, symbols: &mut Vec<Symbol>) {
        let mut seen = HashSet::new();
        for caps in EVENT_RE.captures_iter(source.text()) {
            let Some(name) = caps.get(1) else { continue };
            if source.in_comment(name.start()) || !seen.insert(name.as_str()) {
                continue;
            }
            let position = source.position_at(name.start());
            symbols.push(Symbol::new(
                name.as_str(),
                SymbolKind::Event,
                file_path,
                position,
                source.range(name.start(), name.end()),
            ));
        }
    }

    /// `require`/`include` statements naming the defining file.
    fn push_inclusions(&self, collector: &mut UsageCollector<'_, '_>, source: &SourceText<'_>, symbol: &Symbol) {
        let target = base_name(&symbol.file_path);
        for caps in INCLUDE_RE.captures_iter(source.text()) {
            let Some(path) = caps.get(1) else { continue };
            if base_name(path.as_str()) == target {
                collector.push(path.start(), path.end(), UsageKind::Inclusion);
            }
        }
    }

    fn classify_class(&self, source: &SourceText<'_>, start: usize, end: usize) -> UsageKind {
        let before = strip_qualifier(source.before_on_line(start));
        let after = source.after_on_line(end).trim_start();
        let line = source.line_text(source.line_of(start)).trim_start();

        if ends_with_word(before, "new") || after.starts_with("::") {
            UsageKind::Call
        } else if ends_with_word(before, "extends") {
            UsageKind::Extend
        } else if IMPLEMENTS_LIST_RE.is_match(source.before_on_line(start)) {
            UsageKind::Implement
        } else if line.starts_with("use ") {
            UsageKind::Import
        } else {
            UsageKind::Reference
        }
    }

    fn find_event_usages(&self, collector: &mut UsageCollector<'_, '_>, source: &SourceText<'_>, name: &str) {
        let text = source.text();
        for (idx, _) in text.match_indices(name) {
            let Some(quote) = text[..idx].chars().next_back() else {
                continue;
            };
            if !matches!(quote, '\'' | '"') || !text[idx + name.len()..].starts_with(quote) {
                continue;
            }
            let before = source.before_on_line(idx);
            let before = &before[..before.len() - quote.len_utf8()];
            // registrations (add_action, add_filter) and bare mentions are references
            let kind = if HOOK_FIRE_RE.is_match(before) {
                UsageKind::Call
            } else {
                UsageKind::Reference
            };
            collector.push(idx, idx + name.len(), kind);
        }
    }
}

/// Whether the quote characters directly around `start..end` match.
fn is_quoted(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    matches!(before, Some('\'' | '"')) && before == after
}

impl Extractor for PhpExtractor {
    fn language(&self) -> Language {
        Language::Php
    }

    fn comment_syntax(&self) -> CommentSyntax {
        CommentSyntax::PHP
    }

    fn parse_symbols(&self, content: &str, file_path: &str) -> Vec<Symbol> {
        let source = self.prepare(content);
        let mut symbols = Vec::new();
        let class_spans = self.collect_classes(&source, file_path, &mut symbols);
        self.collect_functions(&source, file_path, &class_spans, &mut symbols);
        self.collect_events(&source, file_path, &mut symbols);
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
        let text = source.text();
        let name = symbol.name.as_str();

        match symbol.kind {
            SymbolKind::Class => {
                self.push_inclusions(&mut collector, source, symbol);
                for start in word_occurrences(text, name) {
                    let end = start + name.len();
                    let kind = self.classify_class(source, start, end);
                    collector.push(start, end, kind);
                }
            }
            SymbolKind::Function => {
                self.push_inclusions(&mut collector, source, symbol);
                for start in word_occurrences(text, name) {
                    let end = start + name.len();
                    let before = source.before_on_line(start).trim_end();
                    if before.ends_with("->") || before.ends_with("::") || ends_with_word(before, "function") {
                        continue;
                    }
                    let kind = if source.after_on_line(end).trim_start().starts_with('(') {
                        UsageKind::Call
                    } else if is_quoted(text, start, end) {
                        UsageKind::Reference
                    } else if source.line_text(source.line_of(start)).trim_start().starts_with("use ") {
                        UsageKind::Import
                    } else {
                        UsageKind::Reference
                    };
                    collector.push(start, end, kind);
                }
            }
            SymbolKind::Method => {
                for start in word_occurrences(text, name) {
                    let end = start + name.len();
                    let before = source.before_on_line(start).trim_end();
                    let member_access = before.ends_with("->") || before.ends_with("::");
                    let kind = if member_access
                        && source.after_on_line(end).trim_start().starts_with('(')
                    {
                        UsageKind::Call
                    } else if member_access || is_quoted(text, start, end) {
                        UsageKind::Reference
                    } else {
                        continue;
                    };
                    collector.push(start, end, kind);
                }
            }
            SymbolKind::Variable => {
                for start in word_occurrences(text, name) {
                    if source.before_on_line(start).trim_end().ends_with("->") {
                        continue;
                    }
                    collector.push(start, start + name.len(), UsageKind::Reference);
                }
            }
            SymbolKind::Event => self.find_event_usages(&mut collector, source, name),
            SymbolKind::Selector => {
                if let Some(key) = selector_key(name) {
                    push_markup_references(&mut collector, source, &key);
                }
            }
            SymbolKind::File => {}
        }

        collector.finish()
    }
}
