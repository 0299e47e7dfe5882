use crate::error::{ChunkerError, Result};
use std::path::Path;

/// Language of a source or documentation file, detected from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Swift,
    Kotlin,
    Markdown,
    ReStructuredText,
    AsciiDoc,
    PlainText,
    Unknown,
}

/// Extension table; lookups lowercase the extension first.
const EXTENSIONS: &[(&str, Language)] = &[
    ("rs", Language::Rust),
    ("py", Language::Python),
    ("pyw", Language::Python),
    ("js", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("ts", Language::TypeScript),
    ("mts", Language::TypeScript),
    ("cts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("go", Language::Go),
    ("java", Language::Java),
    ("c", Language::C),
    ("h", Language::C),
    ("cpp", Language::Cpp),
    ("cc", Language::Cpp),
    ("cxx", Language::Cpp),
    ("hpp", Language::Cpp),
    ("hh", Language::Cpp),
    ("hxx", Language::Cpp),
    ("cs", Language::CSharp),
    ("rb", Language::Ruby),
    ("swift", Language::Swift),
    ("kt", Language::Kotlin),
    ("kts", Language::Kotlin),
    ("md", Language::Markdown),
    ("mdx", Language::Markdown),
    ("markdown", Language::Markdown),
    ("rst", Language::ReStructuredText),
    ("adoc", Language::AsciiDoc),
    ("txt", Language::PlainText),
];

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map_or(Language::Unknown, |(_, language)| *language)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(Language::Unknown, Self::from_extension)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Markdown => "markdown",
            Language::ReStructuredText => "rst",
            Language::AsciiDoc => "asciidoc",
            Language::PlainText => "text",
            Language::Unknown => "unknown",
        }
    }

    /// Prose formats; their files are indexed as documentation.
    pub const fn is_markup(self) -> bool {
        matches!(
            self,
            Language::Markdown
                | Language::ReStructuredText
                | Language::AsciiDoc
                | Language::PlainText
        )
    }

    /// Whether a bundled grammar can split this language into declarations
    pub fn supports_ast(self) -> bool {
        self.tree_sitter_language().is_ok()
    }

    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Language::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            _ => Err(ChunkerError::unsupported_language(self.as_str())),
        }
    }

    /// Line prefixes of comments that attach to the declaration below them
    pub fn doc_comment_prefixes(self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["///", "//!", "/**", "*", "#["],
            Language::JavaScript | Language::TypeScript => &["//", "/*", "*", "@"],
            Language::Python | Language::Ruby => &["#"],
            Language::Go
            | Language::Java
            | Language::C
            | Language::Cpp
            | Language::CSharp
            | Language::Swift
            | Language::Kotlin => &["//", "/*", "*"],
            _ => &[],
        }
    }
}
