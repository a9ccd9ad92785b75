//! In-memory key-value store with per-key expiry
//!
//! Expiry is evaluated lazily on access and, optionally, by a background
//! sweep task. Time is read from `tokio::time` so paused test clocks apply.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval};
use tracing::debug;

use crate::error::Result;
use crate::traits::{ConditionalDelete, KvStore};

#[derive(Debug, Clone)]
struct StoreEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoreEntry {
    fn new(value: &[u8], expiry: Option<Duration>) -> Self {
        Self {
            value: value.to_vec(),
            expires_at: expiry.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// `DashMap`-backed store. Insert-if-absent is atomic per key.
pub struct MemoryKvStore {
    entries: Arc<DashMap<String, StoreEntry>>,
    cleanup_handle: Option<JoinHandle<()>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            cleanup_handle: None,
        }
    }

    /// Start a background task that drops expired keys every `every`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_cleanup(mut self, every: Duration) -> Self {
        let entries = self.entries.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                let purged = purge(&entries);
                if purged > 0 {
                    debug!(count = purged, "Purged expired store entries");
                }
            }
        });
        self.cleanup_handle = Some(handle);
        self
    }

    /// Drop every expired key, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Number of stored keys, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn purge(entries: &DashMap<String, StoreEntry>) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired());
    before.saturating_sub(entries.len())
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryKvStore {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> Result<()> {
        self.entries
            .insert(key.to_string(), StoreEntry::new(value, expiry));
        Ok(())
    }

    async fn insert_if_absent(&self, key: &str, value: &[u8], expiry: Duration) -> Result<bool> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(StoreEntry::new(value, Some(expiry)));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoreEntry::new(value, Some(expiry)));
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<ConditionalDelete> {
        let removed = self
            .entries
            .remove_if(key, |_, entry| !entry.is_expired() && entry.value == expected);

        Ok(if removed.is_some() {
            ConditionalDelete::Deleted
        } else {
            ConditionalDelete::NotOwner
        })
    }
}
