//! Fault-injecting store wrapper for tests
//!
//! `FaultyStore` forwards to an inner store and can be switched, per
//! operation kind, to fail with [`StoreError::Unavailable`]. It also counts
//! calls so tests can assert how often the lock path touched the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::traits::{ConditionalDelete, KvStore};

#[derive(Default)]
struct Faults {
    reads: AtomicBool,
    writes: AtomicBool,
    inserts: AtomicBool,
    deletes: AtomicBool,
    no_conditional_delete: AtomicBool,
}

#[derive(Default)]
struct Calls {
    get: AtomicUsize,
    set: AtomicUsize,
    insert: AtomicUsize,
    delete: AtomicUsize,
    conditional_delete: AtomicUsize,
}

pub struct FaultyStore {
    inner: Arc<dyn KvStore>,
    faults: Faults,
    calls: Calls,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn KvStore>) -> Self {
        Self {
            inner,
            faults: Faults::default(),
            calls: Calls::default(),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.faults.inserts.store(fail, Ordering::SeqCst);
    }

    /// Fail both `delete` and `delete_if_equals`
    pub fn fail_deletes(&self, fail: bool) {
        self.faults.deletes.store(fail, Ordering::SeqCst);
    }

    /// Report compare-and-delete as unsupported
    pub fn disable_conditional_delete(&self, disable: bool) {
        self.faults
            .no_conditional_delete
            .store(disable, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.calls.get.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.calls.set.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.calls.insert.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    pub fn conditional_delete_calls(&self) -> usize {
        self.calls.conditional_delete.load(Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!("injected {} failure", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KvStore for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.faults.reads, "get")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> Result<()> {
        self.calls.set.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.faults.writes, "set")?;
        self.inner.set(key, value, expiry).await
    }

    async fn insert_if_absent(&self, key: &str, value: &[u8], expiry: Duration) -> Result<bool> {
        self.calls.insert.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.faults.inserts, "insert")?;
        self.inner.insert_if_absent(key, value, expiry).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.faults.deletes, "delete")?;
        self.inner.delete(key).await
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<ConditionalDelete> {
        self.calls.conditional_delete.fetch_add(1, Ordering::SeqCst);
        if self.faults.no_conditional_delete.load(Ordering::SeqCst) {
            return Ok(ConditionalDelete::Unsupported);
        }
        Self::check(&self.faults.deletes, "delete")?;
        self.inner.delete_if_equals(key, expected).await
    }
}
