//! Guarded access to JSON values in a shared key-value cache
//!
//! Every operation takes the lock for the target key, runs caller-supplied
//! logic against the value and, for `modify` and `set`, writes the value back
//! before the lock is released. Values are stored as JSON.

use std::sync::Arc;
use std::time::Duration;

use phoenix_store::KvStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::LockConfig;
use crate::error::LockError;
use crate::lock::CacheLock;

/// Options for [`GuardedCache::read`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Fail with [`LockError::NotFound`] instead of passing `None` to the inspector
    pub required: bool,
    /// Acquisition deadline; the configured timeout when unset
    pub timeout: Option<Duration>,
}

impl ReadOptions {
    pub fn required() -> Self {
        Self {
            required: true,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for [`GuardedCache::modify`]
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyOptions<V> {
    /// Value handed to the mutation when the target key is absent
    pub default: V,
    /// Acquisition deadline; the configured timeout when unset
    pub timeout: Option<Duration>,
}

impl<V> ModifyOptions<V> {
    pub fn new(default: V) -> Self {
        Self {
            default,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Starts absent keys from an empty JSON object when `V` can be read from
/// one (`Value`, maps, structs with all-default fields), else `V::default()`.
impl<V: Default + DeserializeOwned> Default for ModifyOptions<V> {
    fn default() -> Self {
        let default = serde_json::from_value(Value::Object(Map::new())).unwrap_or_default();
        Self::new(default)
    }
}

/// A bare timeout means "default value, this deadline"
impl<V: Default + DeserializeOwned> From<Duration> for ModifyOptions<V> {
    fn from(timeout: Duration) -> Self {
        Self::default().with_timeout(timeout)
    }
}

/// Guarded read, read-modify-write and blind write over a [`KvStore`].
///
/// # Example
///
/// ```rust,ignore
/// let cache = GuardedCache::new(store, LockConfig::default());
///
/// cache
///     .modify("host:7", ModifyOptions::new(json!({})), |host: &mut Value| {
///         host["count"] = json!(1);
///         Ok::<_, LockError>(())
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct GuardedCache {
    lock: CacheLock,
}

impl GuardedCache {
    pub fn new(store: Arc<dyn KvStore>, config: LockConfig) -> Self {
        Self {
            lock: CacheLock::new(store, config),
        }
    }

    pub fn lock(&self) -> &CacheLock {
        &self.lock
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        self.lock.store()
    }

    pub fn config(&self) -> &LockConfig {
        self.lock.config()
    }

    /// Fetch `key` under the lock and hand it to `inspect`. Nothing is written back.
    pub async fn read<V, T, E, F>(
        &self,
        key: &str,
        options: ReadOptions,
        inspect: F,
    ) -> Result<T, E>
    where
        V: DeserializeOwned,
        F: FnOnce(Option<V>) -> Result<T, E>,
        E: From<LockError>,
    {
        let timeout = options.timeout.unwrap_or_else(|| self.config().timeout());
        self.lock
            .with_lock(key, timeout, || async move {
                let value = self.fetch::<V>(key).await?;
                if value.is_none() && options.required {
                    return Err(LockError::NotFound(key.to_string()).into());
                }
                inspect(value)
            })
            .await
    }

    /// Fetch `key` under the lock (or take the default), let `mutate` change
    /// it, then persist it. Nothing is persisted if `mutate` fails.
    pub async fn modify<V, T, E, F, O>(&self, key: &str, options: O, mutate: F) -> Result<T, E>
    where
        V: Serialize + DeserializeOwned,
        O: Into<ModifyOptions<V>>,
        F: FnOnce(&mut V) -> Result<T, E>,
        E: From<LockError>,
    {
        let ModifyOptions { default, timeout } = options.into();
        let timeout = timeout.unwrap_or_else(|| self.config().timeout());
        self.lock
            .with_lock(key, timeout, || async move {
                let mut value = self.fetch::<V>(key).await?.unwrap_or(default);
                let output = mutate(&mut value)?;
                self.persist(key, &value).await?;
                Ok(output)
            })
            .await
    }

    /// Let `prepare` shape `seed` under the lock, then store it over whatever
    /// `key` held. The current value is never read.
    pub async fn set<V, T, E, F>(
        &self,
        key: &str,
        seed: V,
        timeout: Option<Duration>,
        prepare: F,
    ) -> Result<T, E>
    where
        V: Serialize,
        F: FnOnce(&mut V) -> Result<T, E>,
        E: From<LockError>,
    {
        let timeout = timeout.unwrap_or_else(|| self.config().timeout());
        self.lock
            .with_lock(key, timeout, || async move {
                let mut value = seed;
                let output = prepare(&mut value)?;
                self.persist(key, &value).await?;
                Ok(output)
            })
            .await
    }

    async fn fetch<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, LockError> {
        match self.store().get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| LockError::Decode {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn persist<V: Serialize>(&self, key: &str, value: &V) -> Result<(), LockError> {
        let bytes = serde_json::to_vec(value).map_err(|source| LockError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store().set(key, &bytes, None).await?;
        Ok(())
    }
}
