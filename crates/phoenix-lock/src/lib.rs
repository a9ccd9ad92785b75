//! Phoenix Lock - advisory locking over a shared key-value cache
//!
//! This crate provides:
//! - Acquire-with-retry: a mutex built on the store's atomic insert-if-absent
//! - Guarded read, guarded read-modify-write and guarded set of JSON values
//! - Best-effort behaviour when the store itself is unreachable
//! - Lock configuration and metrics

pub mod config;
pub mod error;
pub mod guarded;
pub mod lock;
pub mod metrics;
pub mod token;

pub use config::{LockConfig, ReleasePolicy};
pub use error::{LockError, Result};
pub use guarded::{GuardedCache, ModifyOptions, ReadOptions};
pub use lock::{AcquireAttempt, CacheLock};
pub use token::LockToken;
