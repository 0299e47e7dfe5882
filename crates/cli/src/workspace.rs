use crate::config::{DriftConfig, DRIFT_DIR, INDEX_FILE};
use anyhow::{bail, Context, Result};
use drift_code_chunker::Chunker;
use drift_indexer::Indexer;
use drift_linter::Linter;
use drift_vector_store::{EmbeddingMode, EmbeddingService, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Flag values that take precedence over config file and environment.
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub config: Option<PathBuf>,
    pub embed_mode: Option<EmbeddingMode>,
}

/// A workspace root with its resolved config and on-disk index.
pub(crate) struct Workspace {
    root: PathBuf,
    config: DriftConfig,
}

impl Workspace {
    pub(crate) async fn resolve(root: &Path, overrides: &Overrides) -> Result<Self> {
        if !root.is_dir() {
            bail!("Workspace root {} is not a directory", root.display());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Invalid workspace root {}", root.display()))?;

        let (mut config, source) = DriftConfig::load(&root, overrides.config.as_deref()).await?;
        config.embedding.apply_env()?;
        if let Some(mode) = overrides.embed_mode {
            config.embedding.mode = mode;
        }
        if config.embedding.model_dir.is_relative() {
            config.embedding.model_dir = root.join(&config.embedding.model_dir);
        }
        config.validate()?;

        log::debug!(
            "Workspace {} (config: {}, embedding: {})",
            root.display(),
            source.map_or_else(|| "defaults".to_string(), |p| p.display().to_string()),
            config.embedding.mode.as_str()
        );
        Ok(Self { root, config })
    }

    pub(crate) fn index_path(&self) -> PathBuf {
        self.root.join(DRIFT_DIR).join(INDEX_FILE)
    }

    pub(crate) async fn open_store(&self) -> Result<Arc<VectorStore>> {
        let path = self.index_path();
        let store = VectorStore::open(&path, self.config.embedding.dimension)
            .await
            .with_context(|| {
                format!(
                    "Failed to open index {} (run `drift index --full` to rebuild)",
                    path.display()
                )
            })?;
        Ok(Arc::new(store))
    }

    /// Delete the on-disk index so the next open starts empty.
    pub(crate) async fn remove_index(&self) -> Result<()> {
        match tokio::fs::remove_file(self.index_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove index"),
        }
    }

    pub(crate) fn embedder(&self) -> Result<Arc<EmbeddingService>> {
        Ok(Arc::new(EmbeddingService::from_config(&self.config.embedding)?))
    }

    pub(crate) fn indexer(
        &self,
        embedder: Arc<EmbeddingService>,
        store: Arc<VectorStore>,
    ) -> Result<Indexer> {
        warn_on_model_change(&store, &embedder);
        let chunker = Chunker::new(self.config.chunker.clone())?;
        Ok(Indexer::new(
            &self.root,
            chunker,
            embedder,
            store,
            self.config.indexer.clone(),
        )?)
    }

    pub(crate) fn linter(&self, store: Arc<VectorStore>) -> Result<Linter> {
        Ok(Linter::new(store, self.config.linter.clone())?)
    }
}

/// Vectors from different models are not comparable.
pub(crate) fn warn_on_model_change(store: &VectorStore, embedder: &EmbeddingService) {
    if let Some(stored) = store.model_id() {
        if stored != embedder.model_id() && !store.is_empty() {
            log::warn!(
                "Index was built with '{stored}' but the current model is '{}'; run `drift index --full`",
                embedder.model_id()
            );
        }
    }
}
