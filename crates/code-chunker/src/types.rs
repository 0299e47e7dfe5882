use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Coarse classification of an indexed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Code,
    Doc,
}

impl ChunkKind {
    /// Classify a file by its extension; prose markup formats are docs.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        if Language::from_path(path).is_markup() {
            Self::Doc
        } else {
            Self::Code
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Doc => "doc",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChunkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "code" => Ok(Self::Code),
            "doc" | "docs" => Ok(Self::Doc),
            other => Err(format!("unknown chunk kind '{other}' (expected 'code' or 'doc')")),
        }
    }
}

/// Where a chunk came from, with the metadata that only makes sense for that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChunkOrigin {
    Code {
        language: Option<String>,
        symbol_name: Option<String>,
        chunk_type: Option<ChunkType>,
        parent_scope: Option<String>,
    },
    Doc {
        symbol_name: Option<String>,
        heading_level: Option<u8>,
    },
}

impl ChunkOrigin {
    /// Code origin without a symbol (line windows, fallback output)
    pub fn code(language: impl Into<String>) -> Self {
        Self::Code {
            language: Some(language.into()),
            symbol_name: None,
            chunk_type: None,
            parent_scope: None,
        }
    }

    /// Doc origin without a heading (preamble, line windows)
    #[must_use]
    pub const fn doc() -> Self {
        Self::Doc {
            symbol_name: None,
            heading_level: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ChunkKind {
        match self {
            Self::Code { .. } => ChunkKind::Code,
            Self::Doc { .. } => ChunkKind::Doc,
        }
    }

    #[must_use]
    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            Self::Code { symbol_name, .. } | Self::Doc { symbol_name, .. } => {
                symbol_name.as_deref()
            }
        }
    }
}

/// A chunk of a source file, addressable by `id`.
///
/// `text` is always exactly the file's lines `start_line..=end_line`
/// (1-indexed, inclusive) joined with `\n`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,

    /// Workspace-relative path with forward slashes
    pub file_path: String,

    pub start_line: usize,

    pub end_line: usize,

    pub text: String,

    /// File modification time, milliseconds since the Unix epoch
    pub last_modified: u64,

    pub origin: ChunkOrigin,
}

impl Chunk {
    #[must_use]
    pub const fn kind(&self) -> ChunkKind {
        self.origin.kind()
    }

    #[must_use]
    pub fn symbol_name(&self) -> Option<&str> {
        self.origin.symbol_name()
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        match &self.origin {
            ChunkOrigin::Code { language, .. } => language.as_deref(),
            ChunkOrigin::Doc { .. } => None,
        }
    }

    #[must_use]
    pub const fn chunk_type(&self) -> Option<ChunkType> {
        match &self.origin {
            ChunkOrigin::Code { chunk_type, .. } => *chunk_type,
            ChunkOrigin::Doc { .. } => None,
        }
    }

    /// Inclusive line span.
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Short human-facing reference: the symbol when known, else `path:start-end`.
    #[must_use]
    pub fn display_ref(&self) -> String {
        match self.symbol_name() {
            Some(symbol) => format!("{symbol} ({})", self.file_path),
            None => format!("{}:{}-{}", self.file_path, self.start_line, self.end_line),
        }
    }
}

/// Declaration kind of a code chunk. Rust traits and TypeScript interfaces
/// share `Interface`; statics and top-level assignments are `Variable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Interface,
    Module,
    Impl,
    Type,
    Const,
    Variable,
    Import,
}
