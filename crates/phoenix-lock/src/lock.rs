//! Acquire-with-retry mutex over a key-value store
//!
//! A lock is a key (`<prefix><target key>`) created with the store's atomic
//! insert-if-absent and an expiry equal to the acquisition timeout (with a
//! floor of [`MIN_LOCK_EXPIRY_MS`](crate::config::MIN_LOCK_EXPIRY_MS)). Whoever
//! creates the key holds the lock until it deletes the key or the store
//! expires it.
//!
//! When the store cannot be reached during acquisition the critical section
//! runs anyway, unlocked. Releases are best-effort and rely on the store-side
//! expiry when they fail.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use phoenix_store::{ConditionalDelete, KvStore, StoreError};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::config::{LockConfig, ReleasePolicy};
use crate::error::LockError;
use crate::metrics;
use crate::token::LockToken;

/// Result of a single insert-if-absent attempt
#[derive(Debug)]
pub enum AcquireAttempt {
    /// The lock key was created; the caller holds the lock
    Acquired,
    /// The lock key already exists
    Contended,
    /// The store could not be reached
    StoreUnavailable(StoreError),
}

/// How the critical section ended up running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hold {
    Held,
    Degraded,
}

#[derive(Clone)]
pub struct CacheLock {
    store: Arc<dyn KvStore>,
    config: LockConfig,
}

impl CacheLock {
    pub fn new(store: Arc<dyn KvStore>, config: LockConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Make one attempt to create `lock_key`.
    ///
    /// Store errors other than unavailability are returned as errors.
    pub async fn try_acquire(
        &self,
        lock_key: &str,
        token: &LockToken,
        expiry: Duration,
    ) -> Result<AcquireAttempt, StoreError> {
        match self
            .store
            .insert_if_absent(lock_key, token.as_bytes(), expiry)
            .await
        {
            Ok(true) => Ok(AcquireAttempt::Acquired),
            Ok(false) => Ok(AcquireAttempt::Contended),
            Err(err) if err.is_unavailable() => Ok(AcquireAttempt::StoreUnavailable(err)),
            Err(err) => Err(err),
        }
    }

    /// Run `critical` while holding the lock for `key`.
    ///
    /// Retries every `retry_delay` until `timeout` has elapsed, then fails
    /// with [`LockError::LockTimeout`] without running `critical`. Once
    /// `critical` has run the lock is released exactly once, whether it
    /// returned `Ok`, returned `Err` or panicked; a panic is resumed after
    /// the release.
    ///
    /// Dropping the returned future while `critical` is running leaves the
    /// lock key to expire on its own.
    pub async fn with_lock<T, E, F, Fut>(
        &self,
        key: &str,
        timeout: Duration,
        critical: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        let lock_key = self.config.lock_key(key);
        let token = LockToken::generate();
        let hold = self.acquire(key, &lock_key, &token, timeout).await?;

        let outcome = AssertUnwindSafe(async move { critical().await })
            .catch_unwind()
            .await;

        self.release(&lock_key, &token, hold).await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn acquire(
        &self,
        key: &str,
        lock_key: &str,
        token: &LockToken,
        timeout: Duration,
    ) -> Result<Hold, LockError> {
        let started = Instant::now();
        let expiry = self.config.lock_expiry(timeout);

        loop {
            match self.try_acquire(lock_key, token, expiry).await? {
                AcquireAttempt::Acquired => {
                    let waited = started.elapsed();
                    metrics::record_acquired(waited);
                    debug!(lock_key = %lock_key, token = %token, ?waited, "Lock acquired");
                    return Ok(Hold::Held);
                }
                AcquireAttempt::StoreUnavailable(err) => {
                    metrics::record_degraded();
                    warn!(
                        lock_key = %lock_key,
                        error = %err,
                        "Store unavailable while locking, proceeding without lock"
                    );
                    return Ok(Hold::Degraded);
                }
                AcquireAttempt::Contended => {
                    metrics::record_contended();
                    let waited = started.elapsed();
                    if waited >= timeout {
                        metrics::record_timeout(waited);
                        warn!(lock_key = %lock_key, ?waited, "Unable to lock");
                        return Err(LockError::LockTimeout {
                            key: key.to_string(),
                            waited,
                        });
                    }
                    sleep(self.config.retry_delay().min(timeout - waited)).await;
                }
            }
        }
    }

    async fn release(&self, lock_key: &str, token: &LockToken, hold: Hold) {
        let result = match self.config.release_policy {
            ReleasePolicy::CompareAndDelete => {
                match self.store.delete_if_equals(lock_key, token.as_bytes()).await {
                    Ok(ConditionalDelete::Unsupported) => self.delete(lock_key).await,
                    other => other,
                }
            }
            ReleasePolicy::Unconditional => self.delete(lock_key).await,
        };

        match result {
            Ok(ConditionalDelete::NotOwner) if hold == Hold::Held => {
                warn!(
                    lock_key = %lock_key,
                    token = %token,
                    "Lock expired before release and is now held elsewhere"
                );
            }
            Ok(_) => debug!(lock_key = %lock_key, "Lock released"),
            Err(err) => {
                metrics::record_release_failure();
                warn!(
                    lock_key = %lock_key,
                    error = %err,
                    "Failed to release lock, leaving it to expire"
                );
            }
        }
    }

    async fn delete(&self, lock_key: &str) -> Result<ConditionalDelete, StoreError> {
        self.store
            .delete(lock_key)
            .await
            .map(|()| ConditionalDelete::Deleted)
    }
}
