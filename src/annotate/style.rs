//! Block-comment delimiters keyed by file extension.

use crate::ingest::detect::{extension_of, normalize_extension};
use crate::ingest::Language;

/// Delimiters of a documentation block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentStyle {
    /// Opening line, e.g. `/**`
    pub block_start: &'static str,
    /// Closing line, e.g. ` */`
    pub block_end: &'static str,
    /// Prefix of an empty inner line, e.g. ` *`
    pub line_start: &'static str,
    /// Prefix of an inner line with text, e.g. ` * `
    pub line_prefix: &'static str,
}

impl CommentStyle {
    /// `/** ... */` docblocks.
    pub const DOCBLOCK: CommentStyle = CommentStyle {
        block_start: "/**",
        block_end: " */",
        line_start: " *",
        line_prefix: " * ",
    };

    /// Style for a language.
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Php | Language::JavaScript | Language::Css => Self::DOCBLOCK,
        }
    }

    /// Style for an extension, with or without the leading dot.
    ///
    /// `None` when the extension has no known block comment.
    pub fn for_extension(extension: &str) -> Option<Self> {
        let extension = normalize_extension(extension);
        if let Some(language) = Language::from_extension(&extension) {
            return Some(Self::for_language(language));
        }
        match extension.as_str() {
            "ts" | "tsx" | "mts" | "cts" | "sass" | "pcss" => Some(Self::DOCBLOCK),
            _ => None,
        }
    }

    /// Style for a file path.
    pub fn for_path(path: &str) -> Option<Self> {
        extension_of(path).and_then(|ext| Self::for_extension(&ext))
    }

    /// Inner line carrying `text`, without trailing whitespace when empty.
    pub fn inner_line(&self, text: &str) -> String {
        if text.is_empty() {
            self.line_start.to_string()
        } else {
            format!("{}{}", self.line_prefix, text)
        }
    }
}
