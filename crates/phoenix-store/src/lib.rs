//! Phoenix Store - key-value store abstraction
//!
//! This crate provides:
//! - The `KvStore` trait the locking core is written against
//! - Store error classification (connectivity vs. everything else)
//! - An in-memory backend with per-key expiry
//! - A Redis backend (feature `redis`)
//! - A fault-injecting wrapper for tests (feature `testing`)

pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryKvStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisKvStore;
pub use traits::{ConditionalDelete, KvStore};
