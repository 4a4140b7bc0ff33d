//! Redis connection configuration (§10.3).

use std::time::Duration;

fn default_connection_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(30)
}

/// How to reach the shared KV store and size the pool in front of it.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
    pub min_idle: Option<u32>,
    pub connection_timeout: Duration,
    pub command_timeout: Duration,
    pub database: Option<u8>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            min_idle: Some(1),
            connection_timeout: default_connection_timeout(),
            command_timeout: default_command_timeout(),
            database: None,
            username: None,
            password: None,
        }
    }
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn builder() -> RedisConfigBuilder {
        RedisConfigBuilder::new()
    }

    /// Load from `REDIS_URL` / `REDIS_POOL_SIZE` / `REDIS_DATABASE` /
    /// `REDIS_USERNAME` / `REDIS_PASSWORD` (§10.3). Anything unset keeps its
    /// default.
    pub fn from_env() -> RedisConfigBuilder {
        let mut builder = RedisConfigBuilder::new();

        if let Ok(url) = std::env::var("REDIS_URL") {
            builder = builder.url(url);
        }
        if let Ok(pool_size) = std::env::var("REDIS_POOL_SIZE") {
            if let Ok(size) = pool_size.parse() {
                builder = builder.pool_size(size);
            }
        }
        if let Ok(db) = std::env::var("REDIS_DATABASE") {
            if let Ok(db_num) = db.parse() {
                builder = builder.database(db_num);
            }
        }
        if let Ok(username) = std::env::var("REDIS_USERNAME") {
            builder = builder.username(username);
        }
        if let Ok(password) = std::env::var("REDIS_PASSWORD") {
            builder = builder.password(password);
        }

        builder
    }

    /// The URL handed to the Redis client, with auth and a database number
    /// folded in.
    pub fn connection_url(&self) -> String {
        let mut url = self.url.clone();

        if let Some(password) = &self.password {
            url = match &self.username {
                Some(username) => url.replacen("redis://", &format!("redis://{username}:{password}@"), 1),
                None => url.replacen("redis://", &format!("redis://:{password}@"), 1),
            };
        }

        if let Some(db) = self.database {
            if !url.contains('/') || url.ends_with(':') {
                url = format!("{}/{}", url.trim_end_matches('/'), db);
            }
        }

        url
    }
}

/// Builder for [`RedisConfig`].
#[derive(Default)]
pub struct RedisConfigBuilder {
    config: RedisConfig,
}

impl RedisConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RedisConfig::default(),
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.config.pool_size = size;
        self
    }

    pub fn min_idle(mut self, min_idle: u32) -> Self {
        self.config.min_idle = Some(min_idle);
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    pub fn database(mut self, db: u8) -> Self {
        self.config.database = Some(db);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    pub fn build(self) -> RedisConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_url_folds_in_password_and_database() {
        let config = RedisConfig::builder()
            .url("redis://localhost:6379")
            .password("hunter2")
            .database(3)
            .build();

        assert_eq!(config.connection_url(), "redis://:hunter2@localhost:6379/3");
    }

    #[test]
    fn default_config_points_at_localhost() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.pool_size, 10);
    }
}
