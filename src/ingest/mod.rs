pub mod css;
pub mod detect;
pub mod javascript;
pub mod php;
pub mod source;

pub use css::CssExtractor;
pub use detect::{detect_language, Language};
pub use javascript::JavaScriptExtractor;
pub use php::PhpExtractor;
pub use source::{generate_symbol_id, CommentSyntax, SourceText};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of symbol extracted from source code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Class, interface, trait or enum
    Class,
    /// Free-standing function
    Function,
    /// Function declared inside a class body
    Method,
    /// CSS selector carrying a class or id token
    Selector,
    /// Constant, custom property or preprocessor variable
    Variable,
    /// Named event or hook
    Event,
    /// A whole file (graph nodes only)
    File,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Selector => "selector",
            SymbolKind::Variable => "variable",
            SymbolKind::Event => "event",
            SymbolKind::File => "file",
        }
    }

    /// Capitalized label used in generated descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            SymbolKind::Class => "Class",
            SymbolKind::Function => "Function",
            SymbolKind::Method => "Method",
            SymbolKind::Selector => "Selector",
            SymbolKind::Variable => "Variable",
            SymbolKind::Event => "Event",
            SymbolKind::File => "File",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship between a usage site and the symbol it uses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Call,
    Reference,
    Extend,
    Implement,
    Import,
    Inclusion,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::Call => "call",
            UsageKind::Reference => "reference",
            UsageKind::Extend => "extend",
            UsageKind::Implement => "implement",
            UsageKind::Import => "import",
            UsageKind::Inclusion => "inclusion",
        }
    }
}

impl std::fmt::Display for UsageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero-indexed line and character.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// A named definition site.
///
/// Pure data structure. Usages are attached by the scanner's second pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    /// Stable id derived from file path, name and position
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub position: Position,
    pub range: Range,
    /// Enclosing class name for methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Raw doc comment found directly above the definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub usages: Vec<Usage>,
}

impl Symbol {
    /// Build a symbol with its id derived from path, name and position.
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        file_path: impl Into<String>,
        position: Position,
        range: Range,
    ) -> Self {
        let name = name.into();
        let file_path = file_path.into();
        Self {
            id: generate_symbol_id(&file_path, &name, position),
            name,
            kind,
            file_path,
            position,
            range,
            container: None,
            documentation: None,
            usages: Vec::new(),
        }
    }

    pub fn with_container(mut self, container: Option<String>) -> Self {
        self.container = container;
        self
    }

    pub fn with_documentation(mut self, documentation: Option<String>) -> Self {
        self.documentation = documentation;
        self
    }

    /// Display name, qualified by the container when there is one.
    pub fn qualified_name(&self) -> String {
        match &self.container {
            Some(container) => format!("{}::{}", container, self.name),
            None => self.name.clone(),
        }
    }

    /// Whether a location is this symbol's own definition line.
    pub fn is_definition_site(&self, file_path: &str, line: usize) -> bool {
        self.file_path == file_path && self.position.line == line
    }
}

/// A reference to a symbol found in some file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub file_path: String,
    pub position: Position,
    pub range: Range,
    /// Trimmed source line, for display
    pub context: String,
    pub kind: UsageKind,
}

/// Extraction capability shared by every language variant.
///
/// Both operations are pure: same input, same output, no filesystem access
/// and no state carried between calls.
pub trait Extractor {
    fn language(&self) -> Language;

    fn comment_syntax(&self) -> CommentSyntax;

    /// Extract definitions from file content. Usages are left empty.
    fn parse_symbols(&self, content: &str, file_path: &str) -> Vec<Symbol>;

    /// Find usages of `symbol` in already indexed content.
    fn find_usages_in(&self, source: &SourceText<'_>, file_path: &str, symbol: &Symbol)
        -> Vec<Usage>;

    /// Find usages of `symbol` in `content`.
    fn find_usages(&self, content: &str, file_path: &str, symbol: &Symbol) -> Vec<Usage> {
        let source = self.prepare(content);
        self.find_usages_in(&source, file_path, symbol)
    }

    /// Index `content` once for repeated usage lookups.
    fn prepare<'a>(&self, content: &'a str) -> SourceText<'a> {
        SourceText::new(content, self.comment_syntax())
    }

    /// Whether files in this language can reference `kind` symbols from `origin`.
    fn accepts(&self, origin: Language, kind: SymbolKind) -> bool {
        match kind {
            SymbolKind::Selector => true,
            SymbolKind::Variable if origin == Language::Css => {
                matches!(self.language(), Language::Css | Language::JavaScript)
            }
            SymbolKind::File => false,
            _ => origin == self.language(),
        }
    }
}

impl Extractor for Language {
    fn language(&self) -> Language {
        *self
    }

    fn comment_syntax(&self) -> CommentSyntax {
        match self {
            Language::Php => CommentSyntax::PHP,
            Language::JavaScript => CommentSyntax::JAVASCRIPT,
            Language::Css => CommentSyntax::CSS,
        }
    }

    fn parse_symbols(&self, content: &str, file_path: &str) -> Vec<Symbol> {
        match self {
            Language::Php => PhpExtractor.parse_symbols(content, file_path),
            Language::JavaScript => JavaScriptExtractor.parse_symbols(content, file_path),
            Language::Css => CssExtractor.parse_symbols(content, file_path),
        }
    }

    fn find_usages_in(
        &self,
        source: &SourceText<'_>,
        file_path: &str,
        symbol: &Symbol,
    ) -> Vec<Usage> {
        match self {
            Language::Php => PhpExtractor.find_usages_in(source, file_path, symbol),
            Language::JavaScript => JavaScriptExtractor.find_usages_in(source, file_path, symbol),
            Language::Css => CssExtractor.find_usages_in(source, file_path, symbol),
        }
    }
}

/// Accumulates usages for one symbol in one file.
///
/// Drops matches inside comments, the symbol's own definition line and any
/// second hit on a line that already produced a usage.
pub(crate) struct UsageCollector<'s, 'a> {
    source: &'s SourceText<'a>,
    file_path: &'s str,
    symbol: &'s Symbol,
    lines: HashSet<usize>,
    usages: Vec<Usage>,
}

impl<'s, 'a> UsageCollector<'s, 'a> {
    pub(crate) fn new(source: &'s SourceText<'a>, file_path: &'s str, symbol: &'s Symbol) -> Self {
        Self {
            source,
            file_path,
            symbol,
            lines: HashSet::new(),
            usages: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, start: usize, end: usize, kind: UsageKind) -> bool {
        if self.source.in_comment(start) {
            return false;
        }
        let position = self.source.position_at(start);
        if self.symbol.is_definition_site(self.file_path, position.line) {
            return false;
        }
        if !self.lines.insert(position.line) {
            return false;
        }
        self.usages.push(Usage {
            file_path: self.file_path.to_string(),
            position,
            range: self.source.range(start, end),
            context: self.source.context_at(start),
            kind,
        });
        true
    }

    pub(crate) fn finish(mut self) -> Vec<Usage> {
        self.usages.sort_by_key(|u| u.position);
        self.usages
    }
}

/// Trailing identifier-ish qualifier characters (`\App\`, `ns.`) removed.
pub(crate) fn strip_qualifier(before: &str) -> &str {
    before
        .trim_end_matches(|c: char| c.is_alphanumeric() || c == '_' || c == '\\')
        .trim_end()
}

/// Whether `text` ends with the keyword `word` as a whole word.
pub(crate) fn ends_with_word(text: &str, word: &str) -> bool {
    text.strip_suffix(word).is_some_and(|head| {
        head.chars()
            .next_back()
            .map_or(true, |c| !source::is_ident_char(c))
    })
}

/// Base name of a path string, with either separator.
pub(crate) fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
