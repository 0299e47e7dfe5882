use crate::changes::ChangeSet;
use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::file_source::{FileSource, LocalFileSource};
use crate::scanner::FileScanner;
use crate::stats::IndexOutcome;
use drift_code_chunker::{ChunkKind, Chunker, Language, SourceFile};
use drift_vector_store::{EmbeddingService, IndexEntry, VectorStore, VectorStoreError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reported after every committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexProgress {
    pub files_done: usize,
    pub files_total: usize,
    pub batches_done: usize,
    pub batches_total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(IndexProgress) + Send + Sync>;

/// Keeps the vector store in step with the workspace files.
///
/// Every file goes through read → delete old entries → chunk → embed →
/// upsert. Files are handled in batches; between batches the store is
/// flushed and the cancellation token is checked, so a cancelled pass keeps
/// everything committed so far.
pub struct Indexer {
    root: PathBuf,
    pipeline: Pipeline,
    config: IndexerConfig,
    progress: Option<ProgressCallback>,
}

/// The per-file work, cheap to clone into spawned tasks.
#[derive(Clone)]
struct Pipeline {
    chunker: Arc<Chunker>,
    embedder: Arc<EmbeddingService>,
    store: Arc<VectorStore>,
    source: Arc<dyn FileSource>,
}

enum FileStatus {
    Indexed { language: &'static str, chunks: usize },
    Skipped,
}

impl Pipeline {
    async fn process(&self, path: &str) -> Result<FileStatus> {
        let Some(snapshot) = self.source.read(path).await? else {
            let removed = self.store.delete_by_file_path(path);
            log::debug!("{path} no longer exists, dropped {removed} entries");
            return Ok(FileStatus::Skipped);
        };

        let kind = ChunkKind::from_path(path);
        self.store.delete_by_file_path(path);

        let file = SourceFile::new(path, &snapshot.content)
            .with_kind(kind)
            .with_last_modified(snapshot.last_modified);
        let chunks = self.chunker.chunk(&file);
        if chunks.is_empty() {
            log::debug!("{path} produced no chunks");
            return Ok(FileStatus::Skipped);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let count = chunks.len();
        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry::new(chunk, vector))
            .collect();
        self.store.upsert_batch(entries)?;

        log::debug!("Indexed {path}: {count} chunks");
        Ok(FileStatus::Indexed {
            language: Language::from_path(path).as_str(),
            chunks: count,
        })
    }
}

impl Indexer {
    /// Reads files from disk under `root` unless another source is installed.
    pub fn new(
        root: impl AsRef<Path>,
        chunker: Chunker,
        embedder: Arc<EmbeddingService>,
        store: Arc<VectorStore>,
        config: IndexerConfig,
    ) -> Result<Self> {
        config.validate()?;
        if embedder.dimension() != store.dimension() {
            return Err(VectorStoreError::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimension(),
            }
            .into());
        }

        let root = root.as_ref().to_path_buf();
        Ok(Self {
            pipeline: Pipeline {
                chunker: Arc::new(chunker),
                embedder,
                store,
                source: Arc::new(LocalFileSource::new(&root)),
            },
            root,
            config,
            progress: None,
        })
    }

    #[must_use]
    pub fn with_file_source(mut self, source: Arc<dyn FileSource>) -> Self {
        self.pipeline.source = source;
        self
    }

    #[must_use]
    pub fn with_progress(
        mut self,
        callback: impl Fn(IndexProgress) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Get project root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn store(&self) -> &Arc<VectorStore> {
        &self.pipeline.store
    }

    #[must_use]
    pub fn scanner(&self) -> FileScanner {
        FileScanner::new(&self.root).with_max_file_size(self.config.max_file_size_bytes)
    }

    /// Index the complete file set of the workspace.
    ///
    /// After a pass that ran to completion, entries of paths outside `files`
    /// are purged from the store.
    pub async fn index_workspace(
        &self,
        files: &[String],
        cancel: &CancellationToken,
    ) -> Result<IndexOutcome> {
        let started = Instant::now();
        let files = dedup(files);
        let mut outcome = self.run(&files, cancel).await?;

        if !outcome.cancelled {
            let live: HashSet<&str> = files.iter().map(String::as_str).collect();
            for path in self.pipeline.store.file_paths() {
                if !live.contains(path.as_str()) {
                    let dropped = self.pipeline.store.delete_by_file_path(&path);
                    log::debug!("Purged {path} ({dropped} entries)");
                    outcome.removed += 1;
                }
            }
            self.pipeline.store.flush().await?;
        }

        finish(&mut outcome, started);
        log::info!("Workspace pass: {outcome}");
        Ok(outcome)
    }

    /// Re-index only `changed`; nothing else in the store is touched.
    pub async fn index_incremental(
        &self,
        changed: &[String],
        cancel: &CancellationToken,
    ) -> Result<IndexOutcome> {
        let started = Instant::now();
        let mut outcome = self.run(&dedup(changed), cancel).await?;
        finish(&mut outcome, started);
        log::info!("Incremental pass: {outcome}");
        Ok(outcome)
    }

    /// Scan the root for indexable files and index them as the workspace.
    pub async fn index_root(&self, cancel: &CancellationToken) -> Result<IndexOutcome> {
        let files = self.scan().await?;
        self.index_workspace(&files, cancel).await
    }

    /// Compare scanned files with what the store recorded at index time.
    pub async fn detect_changes(&self) -> Result<ChangeSet> {
        let mut current = HashMap::new();
        for path in self.scan().await? {
            if let Some(mtime) = self.pipeline.source.modified(&path).await? {
                current.insert(path, mtime);
            }
        }
        let indexed = self.pipeline.store.last_modified_by_path();
        Ok(ChangeSet::between(&current, &indexed))
    }

    /// Bring the store up to date with the workspace, touching only what changed.
    pub async fn sync(&self, cancel: &CancellationToken) -> Result<IndexOutcome> {
        let started = Instant::now();
        let changes = self.detect_changes().await?;
        log::info!(
            "Detected {} added, {} modified, {} removed files",
            changes.added.len(),
            changes.modified.len(),
            changes.removed.len()
        );

        let mut outcome = if changes.is_empty() {
            IndexOutcome::new()
        } else {
            self.run(&changes.to_index(), cancel).await?
        };

        if !changes.removed.is_empty() {
            for path in &changes.removed {
                self.pipeline.store.delete_by_file_path(path);
            }
            outcome.removed = changes.removed.len();
            self.pipeline.store.flush().await?;
        }

        finish(&mut outcome, started);
        log::info!("Sync: {outcome}");
        Ok(outcome)
    }

    async fn scan(&self) -> Result<Vec<String>> {
        let scanner = self.scanner();
        tokio::task::spawn_blocking(move || scanner.scan_relative())
            .await
            .map_err(|e| IndexerError::Task(format!("scan: {e}")))
    }

    async fn run(&self, files: &[String], cancel: &CancellationToken) -> Result<IndexOutcome> {
        let mut outcome = IndexOutcome::new();
        self.pipeline
            .store
            .set_model_id(self.pipeline.embedder.model_id());
        let batches: Vec<&[String]> = files.chunks(self.config.batch_size).collect();
        let batches_total = batches.len();
        let mut files_done = 0;

        for (idx, batch) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                log::info!("Indexing cancelled after {idx} of {batches_total} batches");
                outcome.cancelled = true;
                break;
            }

            self.run_batch(batch, &mut outcome).await;
            self.pipeline.store.flush().await?;
            files_done += batch.len();

            if let Some(progress) = &self.progress {
                progress(IndexProgress {
                    files_done,
                    files_total: files.len(),
                    batches_done: idx + 1,
                    batches_total,
                });
            }
        }

        Ok(outcome)
    }

    /// Every per-file failure, dimension mismatches included, lands in `outcome`.
    async fn run_batch(&self, batch: &[String], outcome: &mut IndexOutcome) {
        for group in batch.chunks(self.config.max_concurrent_files) {
            let mut tasks = Vec::with_capacity(group.len());
            for path in group {
                let pipeline = self.pipeline.clone();
                let path = path.clone();
                tasks.push(tokio::spawn(async move {
                    let result = pipeline.process(&path).await;
                    (path, result)
                }));
            }

            for (task, path) in tasks.into_iter().zip(group) {
                match task.await {
                    Ok((_, Ok(FileStatus::Indexed { language, chunks }))) => {
                        outcome.add_file(language, chunks);
                    }
                    Ok((_, Ok(FileStatus::Skipped))) => outcome.add_skipped(),
                    Ok((path, Err(e))) => {
                        if is_dimension_mismatch(&e) {
                            log::error!("Embedding dimension mismatch in {path}: {e}");
                        } else {
                            log::warn!("Failed to index {path}: {e}");
                        }
                        outcome.add_failure(path, e.to_string());
                    }
                    Err(e) => {
                        log::warn!("Indexing task for {path} panicked: {e}");
                        outcome.add_failure(path.clone(), format!("Task panicked: {e}"));
                    }
                }
            }
        }
    }
}

fn is_dimension_mismatch(error: &IndexerError) -> bool {
    matches!(
        error,
        IndexerError::VectorStoreError(VectorStoreError::DimensionMismatch { .. })
    )
}

/// Drop repeated paths, keeping first occurrence order.
fn dedup(files: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(files.len());
    files
        .iter()
        .filter(|path| seen.insert(path.as_str()))
        .cloned()
        .collect()
}

fn finish(outcome: &mut IndexOutcome, started: Instant) {
    #[allow(clippy::cast_possible_truncation)]
    {
        outcome.time_ms = started.elapsed().as_millis() as u64;
    }
    if outcome.time_ms == 0 {
        outcome.time_ms = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_source::MemoryFileSource;
    use drift_code_chunker::ChunkerConfig;
    use drift_vector_store::HashingEmbedder;

    fn indexer(source: Arc<MemoryFileSource>, config: IndexerConfig) -> Indexer {
        let embedder = Arc::new(EmbeddingService::new(Arc::new(HashingEmbedder::new(32))));
        let store = Arc::new(VectorStore::new(32));
        Indexer::new(
            "/workspace",
            Chunker::new(ChunkerConfig::default()).unwrap(),
            embedder,
            store,
            config,
        )
        .unwrap()
        .with_file_source(source)
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let files = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(dedup(&files), vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_indexing() {
        let source = Arc::new(MemoryFileSource::new());
        source.insert(
            "src/lib.rs",
            "fn hello() {\n    println!(\"hello\");\n}\n",
            1_000,
        );
        source.insert("README.md", "# Hello\nCall hello to greet.\n", 2_000);

        let indexer = indexer(source, IndexerConfig::default());
        let files = vec!["src/lib.rs".to_string(), "README.md".to_string()];
        let outcome = indexer
            .index_workspace(&files, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.indexed, 2);
        assert_eq!(outcome.chunks, 2);
        assert_eq!(outcome.languages.get("rust"), Some(&1));
        assert_eq!(outcome.languages.get("markdown"), Some(&1));
        assert_eq!(indexer.store().count_for_path("README.md"), 1);
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected() {
        let embedder = Arc::new(EmbeddingService::new(Arc::new(HashingEmbedder::new(8))));
        let store = Arc::new(VectorStore::new(16));
        let result = Indexer::new(
            ".",
            Chunker::new(ChunkerConfig::default()).unwrap(),
            embedder,
            store,
            IndexerConfig::default(),
        );
        assert!(matches!(
            result,
            Err(IndexerError::VectorStoreError(
                VectorStoreError::DimensionMismatch { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn missing_file_clears_its_entries() {
        let source = Arc::new(MemoryFileSource::new());
        source.insert("notes.txt", "remember the milk\nand the eggs", 1);
        let indexer = indexer(source.clone(), IndexerConfig::default());
        let files = vec!["notes.txt".to_string()];
        let cancel = CancellationToken::new();

        indexer.index_incremental(&files, &cancel).await.unwrap();
        assert_eq!(indexer.store().count_for_path("notes.txt"), 1);

        source.remove("notes.txt");
        let outcome = indexer.index_incremental(&files, &cancel).await.unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(indexer.store().count_for_path("notes.txt"), 0);
    }
}
