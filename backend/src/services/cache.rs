//! The cache-style key/value backend behind the session store's fast
//! path and the token membership index.

use crate::db::redis::RedisPool;
use async_trait::async_trait;
use bb8_redis::redis::{self, AsyncCommands};

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<()>;

    async fn del(&self, key: &str) -> anyhow::Result<()>;

    /// Atomic get-and-delete. At most one of any set of concurrent
    /// callers observes the value; the entry is gone afterwards.
    async fn take(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Remaining time-to-live in seconds, `None` when the key is
    /// absent or has no expiry.
    async fn ttl(&self, key: &str) -> anyhow::Result<Option<u64>>;

    /// All keys under a prefix. Linear cost; mass-revocation only,
    /// never the request hot path.
    async fn scan_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>>;

    async fn ping(&self) -> anyhow::Result<()>;
}

pub struct RedisCache {
    pool: RedisPool,
}

impl RedisCache {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let span = tracing::debug_span!("redis_get", key);
        let _enter = span.enter();

        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<()> {
        let span = tracing::debug_span!("redis_set_ex", key, ttl_seconds);
        let _enter = span.enter();

        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        let span = tracing::debug_span!("redis_del", key);
        let _enter = span.enter();

        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn take(&self, key: &str) -> anyhow::Result<Option<String>> {
        let span = tracing::debug_span!("redis_take", key);
        let _enter = span.enter();

        let mut conn = self.pool.get().await?;
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        Ok(value)
    }

    async fn ttl(&self, key: &str) -> anyhow::Result<Option<u64>> {
        let mut conn = self.pool.get().await?;
        let ttl: i64 = conn.ttl(key).await?;
        // -2 = missing key, -1 = no expiry.
        Ok((ttl >= 0).then_some(ttl as u64))
    }

    async fn scan_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let span = tracing::debug_span!("redis_scan_prefix", prefix);
        let _enter = span.enter();

        let mut conn = self.pool.get().await?;
        let pattern = format!("{}*", prefix);
        let mut keys = Vec::new();
        let mut iter = conn.scan_match::<_, String>(pattern).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.pool.get().await?;
        redis::cmd("PING").query_async::<_, ()>(&mut *conn).await?;
        Ok(())
    }
}
