//! Lock configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix prepended to a target key to form its lock key
pub const DEFAULT_KEY_PREFIX: &str = "lock;";

/// Default acquisition deadline, also used as the lock key's expiry
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Pause between acquisition attempts
pub const DEFAULT_RETRY_DELAY_MS: u64 = 300;

/// Shortest expiry given to a lock key, whatever the acquisition timeout
pub const MIN_LOCK_EXPIRY_MS: u64 = 300;

/// How a holder removes its lock key on release
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Delete only if the lock key still holds this acquisition's token.
    /// Falls back to an unconditional delete on stores without the primitive.
    #[default]
    CompareAndDelete,
    /// Always delete the lock key
    Unconditional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub release_policy: ReleasePolicy,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            release_policy: ReleasePolicy::default(),
        }
    }
}

impl LockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = duration_millis(timeout);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = duration_millis(delay);
        self
    }

    pub fn with_release_policy(mut self, policy: ReleasePolicy) -> Self {
        self.release_policy = policy;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Expiry of a lock key taken with acquisition deadline `timeout`.
    ///
    /// Never below [`MIN_LOCK_EXPIRY_MS`], so a zero timeout still excludes
    /// other holders while its critical section runs.
    pub fn lock_expiry(&self, timeout: Duration) -> Duration {
        timeout.max(Duration::from_millis(MIN_LOCK_EXPIRY_MS))
    }

    /// Lock key guarding `key`
    pub fn lock_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
