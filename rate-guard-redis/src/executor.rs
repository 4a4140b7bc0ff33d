//! `KvExecutor` implementation against Redis: one Lua script per algorithm,
//! each invoked as a single atomic `EVAL`, plus the read-only introspection
//! commands.

use std::collections::HashMap;

use async_trait::async_trait;
use rate_guard_core::{KvArg, KvError, KvExecutor, KvTuple, KvValue, Program};
use redis::AsyncCommands;
use tracing::trace;

use crate::error::RedisAdapterError;
use crate::pool::RedisPool;

/// Refill + debit, grounded on the teacher's token-bucket script but
/// extended with a `retry_after` leg so a denial carries a useful hint
/// instead of a bare zero.
const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_rate = tonumber(ARGV[2])
local cost = tonumber(ARGV[3])
local now = tonumber(ARGV[4])
local ttl = math.ceil(capacity / math.max(refill_rate, 0.0001)) + 10

local data = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(data[1]) or capacity
local last_refill = tonumber(data[2]) or now

local elapsed = math.max(now - last_refill, 0)
tokens = math.min(capacity, tokens + elapsed * refill_rate)

if tokens >= cost then
    tokens = tokens - cost
    redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
    redis.call('EXPIRE', key, ttl)
    return {1, tostring(tokens), 0}
else
    local deficit = cost - tokens
    local retry_after = math.ceil(deficit / math.max(refill_rate, 0.0001))
    redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
    redis.call('EXPIRE', key, ttl)
    return {0, tostring(tokens), retry_after}
end
"#;

/// Single atomic increment plus conditional TTL — the stricter form
/// resolved in §9, wrapped in a script so the increment and the expiry
/// decision happen as one round trip.
const FIXED_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local ttl = tonumber(ARGV[1])

local count = redis.call('INCR', key)
if count == 1 then
    redis.call('EXPIRE', key, ttl)
end

return count
"#;

/// Evict everything outside the window, count what remains, and admit (with
/// a uniquely-identified member) or deny with a retry hint computed from
/// the oldest surviving entry.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local window_start = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local request_id = ARGV[4]
local window = tonumber(ARGV[5])

redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)
local count = redis.call('ZCARD', key)

if count < limit then
    redis.call('ZADD', key, now, request_id)
    redis.call('EXPIRE', key, window + 10)
    local new_count = redis.call('ZCARD', key)
    return {1, limit - new_count, 0}
else
    local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
    local retry_after = 1
    if oldest[2] ~= nil then
        retry_after = math.max(math.ceil(tonumber(oldest[2]) + window - now), 1)
    end
    return {0, 0, retry_after}
end
"#;

/// `KvExecutor` backed by a pooled Redis connection. Each `eval` call maps
/// its [`Program`] to the matching script above and submits it as a single
/// `EVAL`; the scripts themselves carry the atomicity guarantee.
pub struct RedisKvExecutor {
    pool: RedisPool,
    token_bucket_script: redis::Script,
    fixed_window_script: redis::Script,
    sliding_window_script: redis::Script,
}

impl RedisKvExecutor {
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            token_bucket_script: redis::Script::new(TOKEN_BUCKET_SCRIPT),
            fixed_window_script: redis::Script::new(FIXED_WINDOW_SCRIPT),
            sliding_window_script: redis::Script::new(SLIDING_WINDOW_SCRIPT),
        }
    }
}

#[async_trait]
impl KvExecutor for RedisKvExecutor {
    async fn eval(&self, program: Program, keys: &[&str], args: &[KvArg]) -> Result<KvTuple, KvError> {
        let key = keys
            .first()
            .ok_or_else(|| KvError::Protocol("atomic program requires one key".into()))?;
        trace!(?program, key, "redis kv: eval");

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(RedisAdapterError::from)?;

        let script = match program {
            Program::TokenBucket => &self.token_bucket_script,
            Program::FixedWindow => &self.fixed_window_script,
            Program::SlidingWindow => &self.sliding_window_script,
        };

        let mut invocation = script.key(*key);
        for arg in args {
            invocation = match arg {
                KvArg::Int(v) => invocation.arg(*v),
                KvArg::Real(v) => invocation.arg(*v),
                KvArg::Str(v) => invocation.arg(v.as_str()),
            };
        }

        match program {
            Program::TokenBucket => {
                let (allowed, tokens, retry_after): (i64, String, i64) = invocation
                    .invoke_async(&mut *conn)
                    .await
                    .map_err(RedisAdapterError::from)?;
                Ok(vec![
                    KvValue::Int(allowed),
                    KvValue::Real(tokens.parse().map_err(|_| {
                        KvError::Protocol(format!("token bucket: non-numeric tokens {tokens:?}"))
                    })?),
                    KvValue::Int(retry_after),
                ])
            }
            Program::FixedWindow => {
                let count: i64 = invocation
                    .invoke_async(&mut *conn)
                    .await
                    .map_err(RedisAdapterError::from)?;
                Ok(vec![KvValue::Int(count)])
            }
            Program::SlidingWindow => {
                let (allowed, remaining, retry_after): (i64, i64, i64) = invocation
                    .invoke_async(&mut *conn)
                    .await
                    .map_err(RedisAdapterError::from)?;
                Ok(vec![
                    KvValue::Int(allowed),
                    KvValue::Int(remaining),
                    KvValue::Int(retry_after),
                ])
            }
        }
    }

    async fn hash_read_all(&self, key: &str) -> Result<HashMap<String, String>, KvError> {
        let mut conn = self.pool.get().await.map_err(RedisAdapterError::from)?;
        let fields: HashMap<String, String> = conn
            .hgetall(key)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(fields)
    }

    async fn sorted_set_range_with_scores(&self, key: &str) -> Result<Vec<(String, f64)>, KvError> {
        let mut conn = self.pool.get().await.map_err(RedisAdapterError::from)?;
        let members: Vec<(String, f64)> = conn
            .zrange_withscores(key, 0, -1)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(members)
    }

    async fn ping(&self) -> Result<(), KvError> {
        let mut conn = self.pool.get().await.map_err(RedisAdapterError::from)?;
        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(())
    }
}
