//! Language detection from file extensions.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source language variants understood by the extractors.
///
/// Closed set: one script-class language, one behavior language and one
/// stylesheet language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Server-side scripting with classes and functions (PHP)
    Php,
    /// Client-side behavior scripting (JavaScript)
    JavaScript,
    /// Stylesheets (CSS, SCSS, LESS)
    Css,
}

impl Language {
    /// Every extension registered by default, with its language.
    pub const DEFAULT_EXTENSIONS: &'static [(&'static str, Language)] = &[
        ("php", Language::Php),
        ("phtml", Language::Php),
        ("inc", Language::Php),
        ("js", Language::JavaScript),
        ("mjs", Language::JavaScript),
        ("cjs", Language::JavaScript),
        ("jsx", Language::JavaScript),
        ("css", Language::Css),
        ("scss", Language::Css),
        ("less", Language::Css),
    ];

    /// Default language for a file extension (without the leading dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = normalize_extension(extension);
        Self::DEFAULT_EXTENSIONS
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, language)| *language)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Php => "php",
            Language::JavaScript => "javascript",
            Language::Css => "css",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase an extension and drop a leading dot.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

/// Extension of a path string, normalized.
pub fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(normalize_extension)
}

/// Detect the default language of a file from its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Language::from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(Path::new("src/cart.php")), Some(Language::Php));
        assert_eq!(detect_language(Path::new("app.JS")), Some(Language::JavaScript));
        assert_eq!(detect_language(Path::new("theme.scss")), Some(Language::Css));
        assert_eq!(detect_language(Path::new("README.md")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn test_from_extension_accepts_leading_dot() {
        assert_eq!(Language::from_extension(".css"), Some(Language::Css));
        assert_eq!(extension_of("a/b/c.PHP"), Some("php".to_string()));
    }
}
