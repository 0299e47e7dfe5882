use anyhow::{Context, Result};
use drift_code_chunker::ChunkerConfig;
use drift_indexer::IndexerConfig;
use drift_linter::LinterConfig;
use drift_vector_store::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub(crate) const DRIFT_DIR: &str = ".drift";
pub(crate) const CONFIG_FILE: &str = "config.toml";
pub(crate) const INDEX_FILE: &str = "index.json";

/// Contents of `.drift/config.toml`; every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DriftConfig {
    pub chunker: ChunkerConfig,
    pub embedding: EmbeddingConfig,
    pub indexer: IndexerConfig,
    pub linter: LinterConfig,
}

impl DriftConfig {
    /// Load `explicit` (which must exist) or the workspace's default config file when present.
    pub(crate) async fn load(
        root: &Path,
        explicit: Option<&Path>,
    ) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = root.join(DRIFT_DIR).join(CONFIG_FILE);
                let present = tokio::fs::metadata(&default)
                    .await
                    .is_ok_and(|meta| meta.is_file());
                if !present {
                    return Ok((Self::default(), None));
                }
                default
            }
        };

        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok((config, Some(path)))
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.chunker.validate().context("[chunker]")?;
        self.embedding.validate().context("[embedding]")?;
        self.indexer.validate().context("[indexer]")?;
        self.linter.validate().context("[linter]")?;
        Ok(())
    }
}
