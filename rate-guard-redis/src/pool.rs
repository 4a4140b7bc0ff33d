//! Connection pool construction.

use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use tracing::info;

use crate::config::RedisConfig;
use crate::error::{RedisAdapterError, Result};

pub type RedisPool = Pool<RedisConnectionManager>;

pub struct RedisPoolBuilder {
    config: RedisConfig,
}

impl RedisPoolBuilder {
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    pub async fn build(self) -> Result<RedisPool> {
        let url = self.config.connection_url();

        let manager = RedisConnectionManager::new(url)
            .map_err(|e| RedisAdapterError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(self.config.pool_size)
            .min_idle(self.config.min_idle)
            .connection_timeout(self.config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| RedisAdapterError::Pool(e.to_string()))?;

        {
            let mut conn = pool.get().await.map_err(|e| RedisAdapterError::Pool(e.to_string()))?;
            let _: String = redis::cmd("PING")
                .query_async(&mut *conn)
                .await
                .map_err(RedisAdapterError::from)?;
        }

        info!(pool_size = self.config.pool_size, url = %self.config.url, "redis pool created");

        Ok(pool)
    }
}
