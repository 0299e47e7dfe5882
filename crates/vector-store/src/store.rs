use crate::embeddings::cosine_similarity;
use crate::error::{Result, VectorStoreError};
use crate::snapshot::{self, PersistedIndex, PersistedRecord, INDEX_SCHEMA_VERSION};
use crate::types::{IndexEntry, SearchHit, SearchOptions};
use drift_code_chunker::{Chunk, ChunkKind};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-process vector index with brute-force cosine search.
///
/// Shared as `Arc<VectorStore>`: searches take a read lock, writers hold the
/// write lock for one batch at a time. A store opened with a path persists
/// on [`VectorStore::flush`].
pub struct VectorStore {
    dimension: usize,
    path: Option<PathBuf>,
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    entries: HashMap<String, Stored>,
    next_seq: u64,
    model_id: Option<String>,
    dirty: bool,
}

#[derive(Clone)]
struct Stored {
    seq: u64,
    entry: IndexEntry,
}

/// Undo record for one applied write inside a batch.
enum JournalOp {
    Inserted(String),
    Replaced(Stored),
}

impl VectorStore {
    /// In-memory store; `flush` is a no-op.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            path: None,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// File-backed store, loading the snapshot at `path` when one exists.
    pub async fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut state = StoreState::default();

        if let Some(persisted) = snapshot::load(&path).await? {
            if persisted.dimension != dimension {
                return Err(VectorStoreError::dimension(dimension, persisted.dimension));
            }
            state.model_id = persisted.model_id;
            for record in persisted.records {
                let entry = IndexEntry::from(record);
                if entry.vector.len() != dimension {
                    return Err(VectorStoreError::dimension(dimension, entry.vector.len()));
                }
                let seq = state.next_seq;
                state.next_seq += 1;
                state.entries.insert(entry.chunk.id.clone(), Stored { seq, entry });
            }
            log::info!(
                "Loaded {} index entries from {}",
                state.entries.len(),
                path.display()
            );
        }

        Ok(Self {
            dimension,
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Model that produced the stored vectors, as recorded by the last writer.
    #[must_use]
    pub fn model_id(&self) -> Option<String> {
        self.read().model_id.clone()
    }

    pub fn set_model_id(&self, model_id: impl Into<String>) {
        let model_id = model_id.into();
        let mut state = self.write();
        if state.model_id.as_deref() != Some(model_id.as_str()) {
            state.model_id = Some(model_id);
            state.dirty = true;
        }
    }

    /// Insert or replace a single entry.
    pub fn upsert(&self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        self.upsert_batch(vec![IndexEntry::new(chunk, vector)])
    }

    /// Apply a batch atomically.
    ///
    /// Either every entry is written or, on the first invalid one, the store
    /// is rolled back to exactly its pre-batch state and the error returned:
    /// `DimensionMismatch` for a wrong-sized vector, `StoreWrite` otherwise.
    /// Replacing an id keeps the entry's original insertion order.
    pub fn upsert_batch(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut state = self.write();
        let seq_before = state.next_seq;
        let mut journal: Vec<JournalOp> = Vec::with_capacity(entries.len());
        let mut batch_ids: HashSet<String> = HashSet::with_capacity(entries.len());

        for (idx, entry) in entries.into_iter().enumerate() {
            let rejection = self.validate(idx, &entry).err().or_else(|| {
                (!batch_ids.insert(entry.chunk.id.clone())).then(|| {
                    VectorStoreError::StoreWrite(format!(
                        "entry {idx} ({}): duplicate id in batch",
                        entry.chunk.id
                    ))
                })
            });

            if let Some(err) = rejection {
                rollback(&mut state, journal, seq_before);
                log::warn!("Rolled back write batch: {err}");
                return Err(err);
            }

            let id = entry.chunk.id.clone();
            let existing_seq = state.entries.get(&id).map(|stored| stored.seq);
            let seq = match existing_seq {
                Some(seq) => seq,
                None => {
                    let seq = state.next_seq;
                    state.next_seq += 1;
                    seq
                }
            };
            match state.entries.insert(id.clone(), Stored { seq, entry }) {
                Some(previous) => journal.push(JournalOp::Replaced(previous)),
                None => journal.push(JournalOp::Inserted(id)),
            }
        }

        state.dirty = true;
        Ok(())
    }

    fn validate(&self, idx: usize, entry: &IndexEntry) -> Result<()> {
        let id = &entry.chunk.id;
        if id.is_empty() {
            return Err(VectorStoreError::StoreWrite(format!("entry {idx}: empty id")));
        }
        if entry.vector.len() != self.dimension {
            return Err(VectorStoreError::dimension(self.dimension, entry.vector.len()));
        }
        if entry.vector.iter().any(|v| !v.is_finite()) {
            return Err(VectorStoreError::StoreWrite(format!(
                "entry {idx} ({id}): vector has non-finite components"
            )));
        }
        Ok(())
    }

    /// Rank stored entries by cosine similarity to `query`.
    ///
    /// Descending score; equal scores keep insertion order.
    pub fn search(&self, query: &[f32], options: SearchOptions) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::dimension(self.dimension, query.len()));
        }
        if options.top_k == 0 {
            return Ok(vec![]);
        }

        let state = self.read();
        let mut scored: Vec<(f32, u64, &IndexEntry)> = Vec::new();
        for stored in state.entries.values() {
            if options.kind.is_some_and(|kind| stored.entry.chunk.kind() != kind) {
                continue;
            }
            let score = cosine_similarity(query, &stored.entry.vector)?;
            if score.is_nan() || options.min_score.is_some_and(|min| score < min) {
                continue;
            }
            scored.push((score, stored.seq, &stored.entry));
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(options.top_k);

        Ok(scored
            .into_iter()
            .map(|(score, _, entry)| SearchHit {
                chunk: entry.chunk.clone(),
                score,
            })
            .collect())
    }

    /// Remove every entry of one file; returns how many were removed.
    pub fn delete_by_file_path(&self, file_path: &str) -> usize {
        let mut state = self.write();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, stored| stored.entry.chunk.file_path != file_path);
        let removed = before - state.entries.len();
        if removed > 0 {
            state.dirty = true;
        }
        removed
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.entries.clear();
        state.next_seq = 0;
        state.dirty = true;
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    #[must_use]
    pub fn count_for_path(&self, file_path: &str) -> usize {
        self.read()
            .entries
            .values()
            .filter(|stored| stored.entry.chunk.file_path == file_path)
            .count()
    }

    /// Distinct indexed paths, sorted.
    #[must_use]
    pub fn file_paths(&self) -> Vec<String> {
        self.read()
            .entries
            .values()
            .map(|stored| stored.entry.chunk.file_path.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<IndexEntry> {
        self.read().entries.get(id).map(|stored| stored.entry.clone())
    }

    /// Snapshot of all entries of `kind`, ordered by path then line.
    #[must_use]
    pub fn entries_of_kind(&self, kind: ChunkKind) -> Vec<IndexEntry> {
        let state = self.read();
        let mut entries: Vec<&Stored> = state
            .entries
            .values()
            .filter(|stored| stored.entry.chunk.kind() == kind)
            .collect();
        entries.sort_by(|a, b| {
            let (ca, cb) = (&a.entry.chunk, &b.entry.chunk);
            ca.file_path
                .cmp(&cb.file_path)
                .then_with(|| ca.start_line.cmp(&cb.start_line))
                .then_with(|| a.seq.cmp(&b.seq))
        });
        entries.into_iter().map(|stored| stored.entry.clone()).collect()
    }

    /// Newest recorded modification time per indexed path.
    #[must_use]
    pub fn last_modified_by_path(&self) -> HashMap<String, u64> {
        let mut out: HashMap<String, u64> = HashMap::new();
        for stored in self.read().entries.values() {
            let chunk = &stored.entry.chunk;
            let slot = out.entry(chunk.file_path.clone()).or_insert(0);
            *slot = (*slot).max(chunk.last_modified);
        }
        out
    }

    /// Persist to the backing file if anything changed since the last flush.
    pub async fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = {
            let mut state = self.write();
            if !state.dirty {
                return Ok(());
            }
            let mut ordered: Vec<&Stored> = state.entries.values().collect();
            ordered.sort_by_key(|stored| stored.seq);
            let persisted = PersistedIndex {
                schema_version: INDEX_SCHEMA_VERSION,
                dimension: self.dimension,
                model_id: state.model_id.clone(),
                records: ordered
                    .into_iter()
                    .map(|stored| PersistedRecord::from(&stored.entry))
                    .collect(),
            };
            let bytes = serde_json::to_vec(&persisted)?;
            state.dirty = false;
            bytes
        };

        if let Err(e) = snapshot::save(path, bytes).await {
            self.write().dirty = true;
            return Err(e);
        }
        log::debug!("Flushed index to {}", path.display());
        Ok(())
    }
}

fn rollback(state: &mut StoreState, journal: Vec<JournalOp>, seq_before: u64) {
    for op in journal.into_iter().rev() {
        match op {
            JournalOp::Inserted(id) => {
                state.entries.remove(&id);
            }
            JournalOp::Replaced(previous) => {
                state
                    .entries
                    .insert(previous.entry.chunk.id.clone(), previous);
            }
        }
    }
    state.next_seq = seq_before;
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_code_chunker::ChunkOrigin;
    use pretty_assertions::assert_eq;

    fn chunk(path: &str, line: usize, kind: ChunkKind) -> Chunk {
        Chunk {
            id: format!("{path}:{line}:{line}"),
            file_path: path.to_string(),
            start_line: line,
            end_line: line,
            text: format!("line {line}"),
            last_modified: line as u64,
            origin: match kind {
                ChunkKind::Code => ChunkOrigin::code("rust"),
                ChunkKind::Doc => ChunkOrigin::doc(),
            },
        }
    }

    fn ids(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.chunk.id.as_str()).collect()
    }

    #[test]
    fn replace_keeps_insertion_order() {
        let store = VectorStore::new(2);
        store.upsert(chunk("a.rs", 1, ChunkKind::Code), vec![1.0, 0.0]).unwrap();
        store.upsert(chunk("a.rs", 2, ChunkKind::Code), vec![1.0, 0.0]).unwrap();
        store.upsert(chunk("a.rs", 1, ChunkKind::Code), vec![2.0, 0.0]).unwrap();

        assert_eq!(store.item_count(), 2);
        let hits = store.search(&[1.0, 0.0], SearchOptions::top_k(5)).unwrap();
        assert_eq!(ids(&hits), vec!["a.rs:1:1", "a.rs:2:2"]);
        assert_eq!(store.get("a.rs:1:1").unwrap().vector, vec![2.0, 0.0]);
    }

    #[test]
    fn search_filters_kind_and_min_score() {
        let store = VectorStore::new(2);
        store
            .upsert_batch(vec![
                IndexEntry::new(chunk("a.rs", 1, ChunkKind::Code), vec![1.0, 0.0]),
                IndexEntry::new(chunk("b.md", 1, ChunkKind::Doc), vec![1.0, 0.0]),
                IndexEntry::new(chunk("c.rs", 1, ChunkKind::Code), vec![0.0, 1.0]),
            ])
            .unwrap();

        let opts = SearchOptions::top_k(10)
            .with_kind(ChunkKind::Code)
            .with_min_score(0.5);
        let hits = store.search(&[1.0, 0.1], opts).unwrap();
        assert_eq!(ids(&hits), vec!["a.rs:1:1"]);
    }

    #[test]
    fn query_dimension_is_checked() {
        let store = VectorStore::new(3);
        assert!(matches!(
            store.search(&[1.0], SearchOptions::default()),
            Err(VectorStoreError::DimensionMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn wrong_sized_vector_is_a_dimension_mismatch() {
        let store = VectorStore::new(2);
        let err = store
            .upsert_batch(vec![
                IndexEntry::new(chunk("a.rs", 1, ChunkKind::Code), vec![1.0, 0.0]),
                IndexEntry::new(chunk("a.rs", 2, ChunkKind::Code), vec![1.0, 0.0, 0.0]),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch { expected: 2, actual: 3 }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_id_in_batch_rolls_back() {
        let store = VectorStore::new(2);
        let entry = IndexEntry::new(chunk("a.rs", 1, ChunkKind::Code), vec![1.0, 0.0]);
        let err = store.upsert_batch(vec![entry.clone(), entry]).unwrap_err();
        assert!(matches!(err, VectorStoreError::StoreWrite(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn rollback_restores_replaced_entries() {
        let store = VectorStore::new(2);
        store.upsert(chunk("a.rs", 1, ChunkKind::Code), vec![1.0, 0.0]).unwrap();

        let result = store.upsert_batch(vec![
            IndexEntry::new(chunk("a.rs", 1, ChunkKind::Code), vec![0.0, 1.0]),
            IndexEntry::new(chunk("a.rs", 2, ChunkKind::Code), vec![f32::NAN, 1.0]),
        ]);
        assert!(result.is_err());
        assert_eq!(store.item_count(), 1);
        assert_eq!(store.get("a.rs:1:1").unwrap().vector, vec![1.0, 0.0]);
    }

    #[test]
    fn last_modified_tracks_newest_chunk() {
        let store = VectorStore::new(1);
        store
            .upsert_batch(vec![
                IndexEntry::new(chunk("a.rs", 3, ChunkKind::Code), vec![1.0]),
                IndexEntry::new(chunk("a.rs", 7, ChunkKind::Code), vec![1.0]),
            ])
            .unwrap();
        assert_eq!(store.last_modified_by_path().get("a.rs"), Some(&7));
        assert_eq!(store.file_paths(), vec!["a.rs".to_string()]);
    }

    #[test]
    fn entries_of_kind_sorted_by_path_and_line() {
        let store = VectorStore::new(1);
        store
            .upsert_batch(vec![
                IndexEntry::new(chunk("z.md", 1, ChunkKind::Doc), vec![1.0]),
                IndexEntry::new(chunk("a.md", 9, ChunkKind::Doc), vec![1.0]),
                IndexEntry::new(chunk("a.md", 2, ChunkKind::Doc), vec![1.0]),
                IndexEntry::new(chunk("m.rs", 1, ChunkKind::Code), vec![1.0]),
            ])
            .unwrap();
        let docs: Vec<_> = store
            .entries_of_kind(ChunkKind::Doc)
            .into_iter()
            .map(|e| e.chunk.id)
            .collect();
        assert_eq!(docs, vec!["a.md:2:2", "a.md:9:9", "z.md:1:1"]);
    }

    #[tokio::test]
    async fn in_memory_flush_is_noop() {
        let store = VectorStore::new(1);
        store.upsert(chunk("a.rs", 1, ChunkKind::Code), vec![1.0]).unwrap();
        store.flush().await.unwrap();
        assert!(store.path().is_none());
    }
}
