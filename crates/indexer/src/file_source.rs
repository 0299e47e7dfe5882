use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

/// File content plus its modification time (ms since the Unix epoch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub content: String,
    pub last_modified: u64,
}

/// Where the indexer reads files from. Paths are workspace-relative.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// `Ok(None)` when the file does not exist.
    async fn read(&self, path: &str) -> Result<Option<SourceSnapshot>>;

    /// Modification time only; the default reads the whole file.
    async fn modified(&self, path: &str) -> Result<Option<u64>> {
        Ok(self.read(path).await?.map(|snapshot| snapshot.last_modified))
    }
}

/// Reads from the local filesystem under a root directory.
pub struct LocalFileSource {
    root: PathBuf,
}

impl LocalFileSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl FileSource for LocalFileSource {
    async fn read(&self, path: &str) -> Result<Option<SourceSnapshot>> {
        let full = self.root.join(path);
        let content = match tokio::fs::read_to_string(&full).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let last_modified = match tokio::fs::metadata(&full).await {
            Ok(meta) => mtime_ms(meta.modified()?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(SourceSnapshot {
            content,
            last_modified,
        }))
    }

    async fn modified(&self, path: &str) -> Result<Option<u64>> {
        match tokio::fs::metadata(self.root.join(path)).await {
            Ok(meta) => Ok(Some(mtime_ms(meta.modified()?))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory files, for tests and editor buffers that are not saved yet.
#[derive(Default)]
pub struct MemoryFileSource {
    files: RwLock<HashMap<String, SourceSnapshot>>,
}

impl MemoryFileSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>, last_modified: u64) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                path.into(),
                SourceSnapshot {
                    content: content.into(),
                    last_modified,
                },
            );
    }

    pub fn remove(&self, path: &str) -> bool {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }

    /// All paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl FileSource for MemoryFileSource {
    async fn read(&self, path: &str) -> Result<Option<SourceSnapshot>> {
        Ok(self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned())
    }
}

pub(crate) fn mtime_ms(modified: SystemTime) -> u64 {
    modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
