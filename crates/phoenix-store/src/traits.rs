//! The key-value store collaborator interface

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Outcome of a compare-and-delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalDelete {
    /// The key held the expected value and was removed
    Deleted,
    /// The key was absent or held another value; nothing was removed
    NotOwner,
    /// The backend has no compare-and-delete primitive
    Unsupported,
}

/// Flat key-value store with atomic insert-if-absent and store-side expiry.
///
/// Values are opaque bytes. Any operation may fail with
/// [`StoreError::Unavailable`](crate::StoreError::Unavailable) when the store
/// cannot be reached.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> Result<()>;

    /// Store `value` under `key` only if the key does not exist.
    ///
    /// Returns `true` if the key was newly created.
    async fn insert_if_absent(&self, key: &str, value: &[u8], expiry: Duration) -> Result<bool>;

    /// Remove `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove `key` only if it currently holds `expected`
    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<ConditionalDelete> {
        let _ = (key, expected);
        Ok(ConditionalDelete::Unsupported)
    }
}
