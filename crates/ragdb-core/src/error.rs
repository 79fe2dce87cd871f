use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No documents processed: ingestion produced zero chunks")]
    EmptyCorpus,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Persisted index unusable: {0}")]
    Persist(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
