use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] drift_code_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] drift_vector_store::VectorStoreError),

    #[error("Invalid indexer configuration: {0}")]
    InvalidConfig(String),

    #[error("Indexing task failed: {0}")]
    Task(String),
}
