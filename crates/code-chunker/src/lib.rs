//! # Drift Code Chunker
//!
//! Splits source files and documentation into addressable, line-aligned
//! chunks for embedding.
//!
//! ## Architecture
//!
//! ```text
//! SourceFile
//!     │
//!     ├──> Kind + language detection (from extension)
//!     │
//!     ├──> Primary strategy
//!     │    ├─> markdown docs: one chunk per ATX heading section
//!     │    └─> rust/python/js/ts: one chunk per top-level declaration (tree-sitter)
//!     │
//!     ├──> Fallback: overlapping line windows
//!     │
//!     └──> Chunk[] with stable ids and exact line-range text
//! ```
//!
//! ## Example
//!
//! ```rust
//! use drift_code_chunker::{Chunker, ChunkerConfig, SourceFile};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//!
//! let code = r#"
//! fn process_data(input: &str) -> String {
//!     input.trim().to_uppercase()
//! }
//! "#;
//!
//! for chunk in chunker.chunk(&SourceFile::new("example.rs", code)) {
//!     println!("{} -> lines {}-{}", chunk.id, chunk.start_line, chunk.end_line);
//! }
//! ```

mod ast_analyzer;
mod chunker;
mod config;
mod error;
mod language;
mod markdown;
mod strategy;
mod types;

pub use chunker::{slice_lines, Chunker, ChunkingStats, SourceFile};
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use language::Language;
pub use types::{Chunk, ChunkKind, ChunkOrigin, ChunkType};
