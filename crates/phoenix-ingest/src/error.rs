//! Ingest error types

use phoenix_lock::LockError;
use phoenix_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data source map not found at '{0}'")]
    MissingMap(String),

    #[error("no cluster '{cluster}' in grid '{grid}' of the data source map")]
    MissingCluster { grid: String, cluster: String },
}

pub type Result<T> = std::result::Result<T, IngestError>;
