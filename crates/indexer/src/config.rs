use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Files per batch; the store is flushed and cancellation checked between batches
    pub batch_size: usize,

    /// Files processed concurrently inside one batch
    pub max_concurrent_files: usize,

    /// Larger files are left out of workspace scans
    pub max_file_size_bytes: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrent_files: 10,
            max_file_size_bytes: 1_048_576,
        }
    }
}

impl IndexerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IndexerError::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.max_concurrent_files == 0 {
            return Err(IndexerError::InvalidConfig(
                "max_concurrent_files must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(IndexerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_batch_is_rejected() {
        let config = IndexerConfig {
            batch_size: 0,
            ..IndexerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
