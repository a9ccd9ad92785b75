//! Store error types

/// Error returned by every `KvStore` operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached (refused, dropped, timed out, pool exhausted)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but rejected or failed the operation
    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is a connectivity failure rather than a rejected operation
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
