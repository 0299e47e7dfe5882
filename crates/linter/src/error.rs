use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinterError>;

#[derive(Error, Debug)]
pub enum LinterError {
    #[error("Invalid linter configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Vector store error: {0}")]
    VectorStore(#[from] drift_vector_store::VectorStoreError),
}
