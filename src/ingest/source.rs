//! Source text utilities shared by every extractor.
//!
//! A [`SourceText`] is built once per file content and reused by every
//! extraction and usage-discovery call against that content, so that
//! offset-to-position math, comment masking and brace matching behave the
//! same everywhere.

use sha2::{Digest, Sha256};

use super::{Position, Range};

/// Lexical comment and string syntax of a language.
///
/// Only what the heuristics need: which tokens open a line comment, whether
/// `/* */` blocks exist, and which characters delimit string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    /// Tokens that start a comment running to the end of the line
    pub line_comments: &'static [&'static str],
    /// Whether `/* ... */` block comments exist
    pub block_comments: bool,
    /// String delimiters; backtick strings may span lines, the others stop at a newline
    pub quotes: &'static [u8],
}

impl CommentSyntax {
    pub const PHP: CommentSyntax = CommentSyntax {
        line_comments: &["//", "#"],
        block_comments: true,
        quotes: b"'\"",
    };

    pub const JAVASCRIPT: CommentSyntax = CommentSyntax {
        line_comments: &["//"],
        block_comments: true,
        quotes: b"'\"`",
    };

    pub const CSS: CommentSyntax = CommentSyntax {
        line_comments: &[],
        block_comments: true,
        quotes: b"'\"",
    };
}

/// File content plus a line index and a comment mask.
#[derive(Debug, Clone)]
pub struct SourceText<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
    comments: Vec<(usize, usize)>,
    syntax: CommentSyntax,
}

impl<'a> SourceText<'a> {
    pub fn new(text: &'a str, syntax: CommentSyntax) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        let comments = scan_comments(text.as_bytes(), &syntax);

        Self {
            text,
            line_starts,
            comments,
            syntax,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-indexed line holding `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        self.line_starts.partition_point(|&start| start <= offset) - 1
    }

    /// Convert a byte offset to a zero-indexed line and character column.
    ///
    /// The column counts Unicode scalar values from the start of the line.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = self.line_of(offset);
        let start = self.line_starts[line];
        let character = self
            .text
            .get(start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - start);

        Position { line, character }
    }

    pub fn range(&self, start: usize, end: usize) -> Range {
        Range {
            start: self.position_at(start),
            end: self.position_at(end.max(start)),
        }
    }

    /// Byte offset where `line` starts, clamped to the end of the text.
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Text of a line without its terminator.
    pub fn line_text(&self, line: usize) -> &'a str {
        if line >= self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[line];
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        self.text[start..end].trim_end_matches('\r')
    }

    /// The trimmed line containing `offset`, used as usage context.
    pub fn context_at(&self, offset: usize) -> String {
        self.line_text(self.line_of(offset)).trim().to_string()
    }

    /// Text between the start of the line and `offset`.
    pub fn before_on_line(&self, offset: usize) -> &'a str {
        let start = self.line_starts[self.line_of(offset)];
        &self.text[start..offset.min(self.text.len())]
    }

    /// Text between `offset` and the end of its line.
    pub fn after_on_line(&self, offset: usize) -> &'a str {
        let offset = offset.min(self.text.len());
        let rest = &self.text[offset..];
        let end = rest.find('\n').unwrap_or(rest.len());
        rest[..end].trim_end_matches('\r')
    }

    /// Whether `offset` falls inside a comment.
    pub fn in_comment(&self, offset: usize) -> bool {
        self.comment_end(offset).is_some()
    }

    /// End offset of the comment covering `offset`, if any.
    pub fn comment_end(&self, offset: usize) -> Option<usize> {
        let idx = self.comments.partition_point(|&(start, _)| start <= offset);
        if idx == 0 {
            return None;
        }
        let (start, end) = self.comments[idx - 1];
        (offset >= start && offset < end).then_some(end)
    }

    /// Offset of the `}` closing the `{` at `open`.
    ///
    /// Returns `None` on unmatched nesting.
    pub fn matching_brace(&self, open: usize) -> Option<usize> {
        let bytes = self.text.as_bytes();
        if bytes.get(open) != Some(&b'{') {
            return None;
        }
        let mut depth = 0usize;
        let mut i = open;
        while i < bytes.len() {
            if let Some(end) = self.comment_end(i) {
                i = end;
                continue;
            }
            let b = bytes[i];
            if self.syntax.quotes.contains(&b) {
                i = skip_string(bytes, i);
                continue;
            }
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// First `{` opening a body after `from`, at parenthesis depth zero.
    ///
    /// `paren_depth` is the depth already open at `from` (1 right after a
    /// parameter list's `(`). A `;` at depth zero means there is no body.
    pub fn find_block_open(&self, from: usize, paren_depth: usize) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let mut depth = paren_depth;
        let mut i = from;
        while i < bytes.len() {
            if let Some(end) = self.comment_end(i) {
                i = end;
                continue;
            }
            let b = bytes[i];
            if self.syntax.quotes.contains(&b) {
                i = skip_string(bytes, i);
                continue;
            }
            match b {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b'{' if depth == 0 => return Some(i),
                b';' if depth == 0 => return None,
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// End offset of the string literal opening at `offset`, if one does.
    pub fn string_end(&self, offset: usize) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let b = *bytes.get(offset)?;
        self.syntax
            .quotes
            .contains(&b)
            .then(|| skip_string(bytes, offset))
    }

    /// Incremental brace-depth tracker starting at `start` with depth zero.
    pub fn depth_tracker(&self, start: usize) -> DepthTracker<'_, 'a> {
        DepthTracker {
            source: self,
            pos: start,
            depth: 0,
        }
    }
}

/// Tracks `{}` nesting while advancing monotonically through a text.
///
/// Strings and comments are skipped, so braces inside them do not count.
pub struct DepthTracker<'s, 'a> {
    source: &'s SourceText<'a>,
    pos: usize,
    depth: usize,
}

impl DepthTracker<'_, '_> {
    /// Brace depth at `offset`. Offsets must be visited in ascending order.
    pub fn advance_to(&mut self, offset: usize) -> usize {
        let bytes = self.source.text.as_bytes();
        let offset = offset.min(bytes.len());
        while self.pos < offset {
            if let Some(end) = self.source.comment_end(self.pos) {
                self.pos = end;
                continue;
            }
            let b = bytes[self.pos];
            if self.source.syntax.quotes.contains(&b) {
                self.pos = skip_string(bytes, self.pos);
                continue;
            }
            match b {
                b'{' => self.depth += 1,
                b'}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
        }
        self.depth
    }
}

/// Skip a string literal starting at `start`, returning the offset after it.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            b'\n' if quote != b'`' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn scan_comments(bytes: &[u8], syntax: &CommentSyntax) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if syntax.quotes.contains(&b) {
            i = skip_string(bytes, i);
            continue;
        }
        if syntax.block_comments && bytes[i..].starts_with(b"/*") {
            let end = find_from(bytes, i + 2, b"*/")
                .map(|e| e + 2)
                .unwrap_or(bytes.len());
            ranges.push((i, end));
            i = end;
            continue;
        }
        if syntax
            .line_comments
            .iter()
            .any(|token| bytes[i..].starts_with(token.as_bytes()))
        {
            let end = bytes[i..]
                .iter()
                .position(|&c| c == b'\n')
                .map(|p| i + p)
                .unwrap_or(bytes.len());
            ranges.push((i, end));
            i = end;
            continue;
        }
        i += 1;
    }
    ranges
}

fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// Generate a stable identifier for a symbol definition.
///
/// SHA-256 over `file_path:name:line:character`, first 8 bytes hex encoded.
/// The same definition site always maps to the same 16-character id.
pub fn generate_symbol_id(file_path: &str, name: &str, position: Position) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    hasher.update(b":");
    hasher.update(position.line.to_be_bytes());
    hasher.update(b":");
    hasher.update(position.character.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Doc comment ending on the line directly above `line`.
///
/// Returns `None` when there is no block comment there or when its opening
/// delimiter cannot be located unambiguously.
pub fn extract_doc_comment(source: &SourceText<'_>, line: usize) -> Option<String> {
    if line == 0 {
        return None;
    }
    let last = line - 1;
    let closing = source.line_text(last).trim();
    if !closing.ends_with("*/") {
        return None;
    }

    let first = if closing.starts_with("/*") {
        last
    } else if closing.contains("/*") {
        return None;
    } else {
        let mut j = last;
        loop {
            if j == 0 {
                return None;
            }
            j -= 1;
            let text = source.line_text(j).trim();
            if text.contains("*/") {
                return None;
            }
            if text.starts_with("/*") {
                break j;
            }
        }
    };

    let body: Vec<String> = (first..=last)
        .map(|l| strip_comment_decoration(source.line_text(l)))
        .collect();
    let start = body.iter().position(|l| !l.is_empty())?;
    let end = body.iter().rposition(|l| !l.is_empty())?;
    Some(body[start..=end].join("\n"))
}

/// Remove `/**`, `*/` and the leading ` * ` from one comment line.
pub fn strip_comment_decoration(line: &str) -> String {
    let mut text = line.trim();
    if let Some(rest) = text.strip_prefix("/**") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("/*") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("*/") {
        text = rest;
    }
    let text = text.trim_start();
    let text = match text.strip_prefix('*') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => text,
    };
    text.trim_end().to_string()
}

/// Whether `name` occurs in `text` as a whole identifier.
///
/// Identifier characters are alphanumerics, `_` and `$`.
pub fn contains_word(text: &str, name: &str) -> bool {
    word_occurrences(text, name).next().is_some()
}

/// Byte offsets of whole-identifier occurrences of `name` in `text`.
pub fn word_occurrences<'t>(text: &'t str, name: &'t str) -> impl Iterator<Item = usize> + 't {
    text.match_indices(name).filter_map(move |(idx, _)| {
        if name.is_empty() {
            return None;
        }
        let before = text[..idx].chars().next_back();
        let after = text[idx + name.len()..].chars().next();
        let boundary = |c: Option<char>| c.map_or(true, |c| !is_ident_char(c));
        (boundary(before) && boundary(after)).then_some(idx)
    })
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
