use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for chunking behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Split code along top-level declarations when a grammar is available
    pub use_syntax: bool,

    /// Lines per window for the line-window strategy
    pub chunk_size: usize,

    /// Lines shared by consecutive windows
    pub chunk_overlap: usize,

    /// Declarations whose trimmed text is shorter than this are dropped as noise
    pub min_chunk_chars: usize,

    /// Extend declarations upward over directly attached doc comments
    pub include_doc_comments: bool,

    /// Fold runs of adjacent import statements into one chunk
    pub merge_imports: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            use_syntax: true,
            chunk_size: 50,
            chunk_overlap: 10,
            min_chunk_chars: 10,
            include_doc_comments: true,
            merge_imports: true,
        }
    }
}

impl ChunkerConfig {
    /// Create config optimized for speed (line windows only)
    #[must_use]
    pub fn for_speed() -> Self {
        Self {
            use_syntax: false,
            include_doc_comments: false,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        Ok(())
    }
}
