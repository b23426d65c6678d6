use crate::config::Config;
use bb8::Pool;
use bb8_redis::{redis, RedisConnectionManager};
use std::time::Duration;

pub type RedisPool = Pool<RedisConnectionManager>;

/// Builds the cache-backend pool and verifies connectivity up front.
/// The session store cannot run without its fast path, so a missing or
/// unreachable Redis is fatal at startup, not a degraded mode
/// discovered per request.
pub async fn create_redis_pool(config: &Config) -> anyhow::Result<RedisPool> {
    let url = config.redis_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("REDIS_URL is required: the session store needs its cache backend")
    })?;

    let manager = RedisConnectionManager::new(url)?;
    let pool = Pool::builder()
        .max_size(config.redis_pool_size)
        .connection_timeout(Duration::from_secs(config.redis_connect_timeout))
        .build(manager)
        .await?;

    {
        let mut conn = pool.get().await?;
        redis::cmd("PING").query_async::<_, ()>(&mut *conn).await?;
    }

    tracing::info!(size = config.redis_pool_size, "Session cache pool ready");
    Ok(pool)
}
