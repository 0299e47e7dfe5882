//! # Drift Indexer
//!
//! Keeps the vector index in step with a workspace.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (.gitignore aware)
//!     │      └─> Code and doc files
//!     │
//!     ├──> Chunker (AST, markdown sections, line windows)
//!     │      └─> Chunks
//!     │
//!     └──> Embedding Service ──> Vector Store
//!            └─> Batches committed one at a time
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use drift_code_chunker::{Chunker, ChunkerConfig};
//! use drift_indexer::{Indexer, IndexerConfig};
//! use drift_vector_store::{EmbeddingService, HashingEmbedder, VectorStore};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = Arc::new(EmbeddingService::new(Arc::new(HashingEmbedder::new(384))));
//!     let store = Arc::new(VectorStore::open("/path/to/project/.drift/index.json", 384).await?);
//!     let indexer = Indexer::new(
//!         "/path/to/project",
//!         Chunker::new(ChunkerConfig::default())?,
//!         embedder,
//!         store,
//!         IndexerConfig::default(),
//!     )?;
//!
//!     let outcome = indexer.sync(&CancellationToken::new()).await?;
//!     println!("Indexed {} files, {} chunks", outcome.indexed, outcome.chunks);
//!     Ok(())
//! }
//! ```

mod changes;
mod config;
mod error;
mod file_source;
mod indexer;
mod scanner;
mod stats;

pub use changes::ChangeSet;
pub use config::IndexerConfig;
pub use error::{IndexerError, Result};
pub use file_source::{FileSource, LocalFileSource, MemoryFileSource, SourceSnapshot};
pub use indexer::{IndexProgress, Indexer, ProgressCallback};
pub use scanner::{normalize_path, FileScanner};
pub use stats::{FileFailure, IndexOutcome};
pub use tokio_util::sync::CancellationToken;
