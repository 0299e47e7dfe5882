//! # Drift Vector Store
//!
//! Embeddings and similarity search for indexed chunks.
//!
//! ## Architecture
//!
//! ```text
//! Chunk[]
//!     │
//!     ├──> EmbeddingService (truncate, batch, check dimension)
//!     │      ├─> HashingEmbedder (offline, deterministic)
//!     │      └─> OnnxEmbedder (ort + tokenizers, lazily loaded)
//!     │
//!     └──> VectorStore
//!            ├─> journaled batch upserts
//!            ├─> brute-force cosine search
//!            └─> JSON snapshot (.drift/index.json)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use drift_vector_store::{EmbeddingConfig, EmbeddingService, SearchOptions, VectorStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = EmbeddingService::from_config(&EmbeddingConfig::default())?;
//!     let store = VectorStore::open(".drift/index.json", embedder.dimension()).await?;
//!
//!     let query = embedder.embed("retry with exponential backoff").await?;
//!     for hit in store.search(&query, SearchOptions::top_k(10))? {
//!         println!("{}: {:.3}", hit.chunk.id, hit.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod hashing;
mod onnx;
mod snapshot;
mod store;
mod types;

pub use embeddings::{
    cosine_similarity, EmbeddingConfig, EmbeddingMode, EmbeddingProvider, EmbeddingService,
    EMBEDDING_MODE_ENV,
};
pub use error::{Result, VectorStoreError};
pub use hashing::HashingEmbedder;
pub use onnx::OnnxEmbedder;
pub use snapshot::INDEX_SCHEMA_VERSION;
pub use store::VectorStore;
pub use types::{IndexEntry, SearchHit, SearchOptions};

// Re-export chunk types for convenience
pub use drift_code_chunker::{Chunk, ChunkKind, ChunkOrigin};
