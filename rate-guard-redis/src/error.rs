//! Redis adapter errors, and their mapping onto `rate_guard_core::KvError`.

use rate_guard_core::KvError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedisAdapterError>;

#[derive(Debug, Error)]
pub enum RedisAdapterError {
    #[error("redis connection error: {0}")]
    Connection(String),

    #[error("redis pool error: {0}")]
    Pool(String),

    #[error("redis command error: {0}")]
    Command(String),

    #[error("redis operation timed out")]
    Timeout,
}

impl From<redis::RedisError> for RedisAdapterError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            RedisAdapterError::Timeout
        } else if err.is_connection_dropped() || err.is_connection_refusal() {
            RedisAdapterError::Connection(err.to_string())
        } else {
            RedisAdapterError::Command(err.to_string())
        }
    }
}

impl<E> From<bb8::RunError<E>> for RedisAdapterError
where
    E: std::error::Error + 'static,
{
    fn from(err: bb8::RunError<E>) -> Self {
        RedisAdapterError::Pool(err.to_string())
    }
}

/// The core only ever sees the fail-open-worthy categories; this collapses
/// the Redis-specific taxonomy into `KvError` at the `KvExecutor` boundary.
impl From<RedisAdapterError> for KvError {
    fn from(err: RedisAdapterError) -> Self {
        match err {
            RedisAdapterError::Connection(msg) => KvError::Connection(msg),
            RedisAdapterError::Pool(msg) => KvError::Connection(msg),
            RedisAdapterError::Timeout => KvError::Timeout,
            RedisAdapterError::Command(msg) => KvError::Other(msg),
        }
    }
}
