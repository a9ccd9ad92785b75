//! Lock error types

use std::time::Duration;

use phoenix_store::StoreError;

/// Errors surfaced by the lock and the guarded operations.
///
/// Guarded operations are generic over the caller's error type, which only
/// needs `From<LockError>`; `LockError` itself satisfies that.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// No attempt to insert the lock key succeeded before the deadline
    #[error("unable to lock '{key}' after {waited:?}")]
    LockTimeout { key: String, waited: Duration },

    /// A guarded read required a value that is not in the store
    #[error("unable to find '{0}'")]
    NotFound(String),

    /// Store failure while reading or writing the target value
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to decode value of '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value of '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LockError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::LockTimeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LockError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
