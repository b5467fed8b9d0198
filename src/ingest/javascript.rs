//! JavaScript symbol extraction.
//!
//! Extracts classes, methods, functions and custom events, and finds
//! usages of script symbols as well as DOM lookups of stylesheet
//! selectors and custom properties.

use std::collections::HashSet;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::css::{class_token_offset, css_occurrences, push_markup_references, selector_key, SelectorKey};
use super::source::{extract_doc_comment, word_occurrences, CommentSyntax, SourceText};
use super::{
    ends_with_word, Extractor, Language, Symbol, SymbolKind, Usage, UsageCollector, UsageKind,
};
use crate::error::UsedByError;

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:export\s+(?:default\s+)?)?class\s+([A-Za-z_$][\w$]*)").unwrap()
});

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:(?:static|async|get|set)\s+)*\*?\s*(#?[A-Za-z_$][\w$]*)\s*\(").unwrap()
});

/// Class field holding an arrow function (`handle = (e) => {`)
static FIELD_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:static\s+)?(#?[A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
    )
    .unwrap()
});

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export\s+(?:default\s+)?)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(",
    )
    .unwrap()
});

static ASSIGNED_FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)",
    )
    .unwrap()
});

static EVENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bnew\s+(?:Custom)?Event|\.trigger)\s*\(\s*['"`]([^'"`\n]+)['"`]"#).unwrap()
});

static LISTENER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:addEventListener|removeEventListener|\.on|\.one|\.off)\s*\(\s*$").unwrap());

static DISPATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\bnew\s+(?:Custom)?Event|\.trigger|\.triggerHandler|dispatchEvent)\s*\(\s*$").unwrap()
});

/// DOM and jQuery calls taking selector, class or id strings
static DOM_LOOKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(classList\.(?:add|remove|toggle|contains|replace)|(?:add|remove|toggle|has)Class|getElementsByClassName|getElementById|querySelectorAll|querySelector|closest|matches|jQuery|\$)\s*\(",
    )
    .unwrap()
});

/// A string literal, possibly preceded by a comma
static STRING_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*,?\s*(?:'([^'\n]*)'|"([^"\n]*)"|`([^`]*)`)"#).unwrap());

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "constructor", "with", "else",
    "do", "typeof", "await", "new",
];

/// Extractor for JavaScript sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupMode {
    /// Full CSS selector string
    Selector,
    /// Space separated class names
    ClassList,
    /// A single element id
    Id,
}

fn lookup_mode(call: &str) -> LookupMode {
    if call == "getElementById" {
        LookupMode::Id
    } else if call.starts_with("classList.") || call.ends_with("Class") || call == "getElementsByClassName" {
        LookupMode::ClassList
    } else {
        LookupMode::Selector
    }
}

impl JavaScriptExtractor {
    fn collect_classes(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        symbols: &mut Vec<Symbol>,
    ) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();

        for caps in CLASS_RE.captures_iter(source.text()) {
            let Some(name) = caps.get(1) else { continue };
            if source.in_comment(name.start()) {
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
        let mut found = Vec::new();

        for caps in METHOD_RE.captures_iter(body) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if CONTROL_KEYWORDS.contains(&name.as_str()) {
                continue;
            }
            let start = body_start + name.start();
            let Some(block) = source.find_block_open(body_start + whole.end(), 1) else {
                continue;
            };
            found.push((start, name.as_str(), source.matching_brace(block)));
        }
        for caps in FIELD_ARROW_RE.captures_iter(body) {
            let Some(name) = caps.get(1) else { continue };
            let start = body_start + name.start();
            let close = source.find_block_open(start, 0).and_then(|o| source.matching_brace(o));
            found.push((start, name.as_str(), close));
        }
        found.sort_by_key(|(start, _, _)| *start);

        let mut depth = source.depth_tracker(body_start);
        for (start, name, close) in found {
            if depth.advance_to(start) != 0 || source.in_comment(start) {
                continue;
            }
            let position = source.position_at(start);
            let end = close.map_or(start + name.len(), |c| c + 1);
            symbols.push(
                Symbol::new(name, SymbolKind::Method, file_path, position, source.range(start, end))
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
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if inside_class(name.start()) || source.in_comment(name.start()) {
                continue;
            }
            let end = source
                .find_block_open(whole.end(), 1)
                .and_then(|o| source.matching_brace(o))
                .map_or(name.end(), |c| c + 1);
            found.push((name.start(), name.as_str(), end));
        }

        let mut depth = source.depth_tracker(0);
        for caps in ASSIGNED_FUNCTION_RE.captures_iter(source.text()) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if depth.advance_to(name.start()) != 0 || source.in_comment(name.start()) {
                continue;
            }
            let end = source
                .find_block_open(whole.end(), 0)
                .and_then(|o| source.matching_brace(o))
                .map_or(name.end(), |c| c + 1);
            found.push((name.start(), name.as_str(), end));
        }

        // declarations nested in another function body are not top-level
        for &(start, name, end) in &found {
            if found.iter().any(|&(s, _, e)| s < start && start < e) {
                continue;
            }
            self.push_function(source, file_path, start, name, end, symbols);
        }
    }

    fn push_function(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        start: usize,
        name: &str,
        end: usize,
        symbols: &mut Vec<Symbol>,
    ) {
        let position = source.position_at(start);
        symbols.push(
            Symbol::new(name, SymbolKind::Function, file_path, position, source.range(start, end))
                .with_documentation(extract_doc_comment(source, position.line)),
        );
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

    fn is_import_line(source: &SourceText<'_>, offset: usize) -> bool {
        let line = source.line_text(source.line_of(offset)).trim_start();
        line.starts_with("import ") || line.starts_with("export {") || line.contains("require(")
    }

    fn find_event_usages(&self, collector: &mut UsageCollector<'_, '_>, source: &SourceText<'_>, name: &str) {
        let text = source.text();
        for (idx, _) in text.match_indices(name) {
            let Some(quote) = text[..idx].chars().next_back() else {
                continue;
            };
            if !matches!(quote, '\'' | '"' | '`') || !text[idx + name.len()..].starts_with(quote) {
                continue;
            }
            let before = source.before_on_line(idx);
            let before = &before[..before.len() - quote.len_utf8()];
            let kind = if LISTENER_RE.is_match(before) {
                UsageKind::Reference
            } else if DISPATCH_RE.is_match(before) {
                UsageKind::Call
            } else {
                UsageKind::Reference
            };
            collector.push(idx, idx + name.len(), kind);
        }
    }

    fn find_selector_usages(
        &self,
        collector: &mut UsageCollector<'_, '_>,
        source: &SourceText<'_>,
        key: &SelectorKey,
    ) {
        let text = source.text();
        let token = key.token();

        for caps in DOM_LOOKUP_RE.captures_iter(text) {
            let (Some(whole), Some(call)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let mode = lookup_mode(call.as_str());
            let mut cursor = whole.end();

            while let Some(arg) = STRING_ARG_RE.captures(&text[cursor..]) {
                let (Some(literal), Some(value)) = (arg.get(0), arg.get(1).or_else(|| arg.get(2)).or_else(|| arg.get(3)))
                else {
                    break;
                };
                let value_start = cursor + value.start();
                let hit = match (mode, key) {
                    (LookupMode::Selector, _) => css_occurrences(value.as_str(), &token).next(),
                    (LookupMode::ClassList, SelectorKey::Class(class)) => {
                        class_token_offset(value.as_str(), class)
                    }
                    (LookupMode::Id, SelectorKey::Id(id)) => (value.as_str().trim() == id)
                        .then(|| value.as_str().find(id.as_str()).unwrap_or(0)),
                    _ => None,
                };
                if let Some(offset) = hit {
                    let start = value_start + offset;
                    let len = match mode {
                        LookupMode::Selector => token.len(),
                        _ => key.name().len(),
                    };
                    collector.push(start, start + len, UsageKind::Reference);
                }
                cursor += literal.end();
                if mode != LookupMode::ClassList {
                    break;
                }
            }
        }

        push_markup_references(collector, source, key);
    }
}

impl Extractor for JavaScriptExtractor {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn comment_syntax(&self) -> CommentSyntax {
        CommentSyntax::JAVASCRIPT
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
                for start in word_occurrences(text, name) {
                    let end = start + name.len();
                    let before = source.before_on_line(start).trim_end();
                    let kind = if ends_with_word(before, "new") || source.after_on_line(end).starts_with('.') {
                        UsageKind::Call
                    } else if ends_with_word(before, "extends") {
                        UsageKind::Extend
                    } else if Self::is_import_line(source, start) {
                        UsageKind::Import
                    } else {
                        UsageKind::Reference
                    };
                    collector.push(start, end, kind);
                }
            }
            SymbolKind::Function => {
                for start in word_occurrences(text, name) {
                    let end = start + name.len();
                    let before = source.before_on_line(start).trim_end();
                    if before.ends_with('.') || ends_with_word(before, "function") {
                        continue;
                    }
                    let kind = if Self::is_import_line(source, start) {
                        UsageKind::Import
                    } else if source.after_on_line(end).trim_start().starts_with('(') {
                        UsageKind::Call
                    } else {
                        UsageKind::Reference
                    };
                    collector.push(start, end, kind);
                }
            }
            SymbolKind::Method => {
                for start in word_occurrences(text, name) {
                    let end = start + name.len();
                    if !source.before_on_line(start).trim_end().ends_with('.') {
                        continue;
                    }
                    let kind = if source.after_on_line(end).trim_start().starts_with('(') {
                        UsageKind::Call
                    } else {
                        UsageKind::Reference
                    };
                    collector.push(start, end, kind);
                }
            }
            SymbolKind::Event => self.find_event_usages(&mut collector, source, name),
            SymbolKind::Selector => {
                if let Some(key) = selector_key(name) {
                    self.find_selector_usages(&mut collector, source, &key);
                }
            }
            SymbolKind::Variable => {
                // custom properties read or written from script
                for start in css_occurrences(text, name) {
                    collector.push(start, start + name.len(), UsageKind::Reference);
                }
            }
            SymbolKind::File => {}
        }

        collector.finish()
    }
}
