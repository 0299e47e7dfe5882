use drift_code_chunker::{Chunk, ChunkKind};
use serde::{Deserialize, Serialize};

/// A chunk together with its embedding, as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl IndexEntry {
    #[must_use]
    pub const fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Knobs for [`crate::VectorStore::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Only entries of this kind are ranked
    pub kind: Option<ChunkKind>,
    /// Hits scoring below this are dropped
    pub min_score: Option<f32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            kind: None,
            min_score: None,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: ChunkKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub const fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}
