//! Redis store backend
//!
//! Insert-if-absent maps to `SET key value NX PX ttl`, compare-and-delete to
//! a server-side Lua script. Connectivity failures surface as
//! [`StoreError::Unavailable`] so the lock path can treat them as
//! best-effort.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::{RedisError, Script};
use tracing::info;

use crate::error::{Result, StoreError};
use crate::traits::{ConditionalDelete, KvStore};

const COMPARE_AND_DELETE: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RedisKvStore {
    pool: Pool<RedisConnectionManager>,
    compare_and_delete: Script,
}

impl RedisKvStore {
    /// Build a connection pool for `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// Connections are established lazily, so an unreachable server is
    /// reported on first use rather than here.
    pub async fn connect(url: &str, pool_size: u32) -> Result<Self> {
        let manager = RedisConnectionManager::new(url).map_err(map_redis_error)?;
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .await
            .map_err(map_redis_error)?;

        info!(url = %url, pool_size, "Redis store configured");

        Ok(Self {
            pool,
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
        })
    }

    async fn connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = expiry {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        cmd.query_async::<_, ()>(&mut *conn)
            .await
            .map_err(map_redis_error)
    }

    async fn insert_if_absent(&self, key: &str, value: &[u8], expiry: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(expiry))
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut *conn)
            .await
            .map(|_| ())
            .map_err(map_redis_error)
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<ConditionalDelete> {
        let mut conn = self.connection().await?;
        let removed: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;

        Ok(if removed > 0 {
            ConditionalDelete::Deleted
        } else {
            ConditionalDelete::NotOwner
        })
    }
}

/// `PX` rejects zero, so sub-millisecond expiries round up to 1ms
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}
