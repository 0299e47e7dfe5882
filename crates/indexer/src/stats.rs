use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A file the pipeline could not index, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Result of one indexing pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexOutcome {
    /// Files that produced at least one chunk
    pub indexed: usize,

    /// Files that were missing or produced no chunks
    pub skipped: usize,

    /// Files that failed; details in `failures`
    pub errors: usize,

    /// Number of chunks written
    pub chunks: usize,

    /// Paths purged from the store because they left the workspace
    pub removed: usize,

    /// The pass stopped early; batches finished before that stay committed
    pub cancelled: bool,

    pub failures: Vec<FileFailure>,

    /// Indexed files per language
    pub languages: HashMap<String, usize>,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl IndexOutcome {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, language: &str, chunks: usize) {
        self.indexed += 1;
        self.chunks += chunks;
        *self.languages.entry(language.to_string()).or_insert(0) += 1;
    }

    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn add_failure(&mut self, path: impl Into<String>, error: impl Into<String>) {
        self.errors += 1;
        self.failures.push(FileFailure {
            path: path.into(),
            error: error.into(),
        });
    }

    /// Files the pass looked at
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.indexed + self.skipped + self.errors
    }
}

impl std::fmt::Display for IndexOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "indexed {} files ({} chunks), skipped {}, errors {}, removed {} in {}ms",
            self.indexed, self.chunks, self.skipped, self.errors, self.removed, self.time_ms
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}
