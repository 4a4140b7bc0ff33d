//! # Rate Guard Redis
//!
//! Redis-backed [`KvExecutor`](rate_guard_core::KvExecutor) for
//! `rate-guard-core`: a pooled connection manager plus the three atomic
//! Lua programs the decision engine needs.
//!
//! ```rust,no_run
//! use rate_guard_redis::{RedisConfig, RedisKvExecutor, RedisPoolBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RedisConfig::from_env().build();
//! let pool = RedisPoolBuilder::new(config).build().await?;
//! let kv = RedisKvExecutor::new(pool);
//! # let _ = kv;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod executor;
mod pool;

pub use config::{RedisConfig, RedisConfigBuilder};
pub use error::{RedisAdapterError, Result};
pub use executor::RedisKvExecutor;
pub use pool::{RedisPool, RedisPoolBuilder};
