//! In-process `KvExecutor`, generalized from a per-algorithm DashMap store
//! into a generic hash/counter/sorted-set emulation so the same
//! introspection calls (`hash_read_all`, `sorted_set_range_with_scores`)
//! work identically whether the backing store is this map or real Redis.
//!
//! Suitable for single-instance deployments and for the test suite. Not
//! distributed — state lives in this process only.

use super::{KvArg, KvError, KvExecutor, KvTuple, KvValue, Program};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

const IDLE_TTL: Duration = Duration::from_secs(3600);

struct Expiring<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Expiring<T> {
    fn fresh(value: T) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }

    fn set_ttl(&mut self, ttl: Duration) {
        self.expires_at = Some(Instant::now() + ttl);
    }
}

/// In-process emulation of the KV store's hash, counter, and sorted-set
/// primitives. Holds no per-algorithm knowledge beyond the three atomic
/// programs it implements natively in Rust instead of as Lua text.
pub struct MemoryKvExecutor {
    hashes: DashMap<String, Expiring<HashMap<String, String>>>,
    counters: DashMap<String, Expiring<i64>>,
    zsets: DashMap<String, Expiring<Vec<(String, f64)>>>,
}

impl MemoryKvExecutor {
    pub fn new() -> Self {
        Self {
            hashes: DashMap::new(),
            counters: DashMap::new(),
            zsets: DashMap::new(),
        }
    }

    /// Number of live keys across all three primitives, for monitoring.
    pub fn key_count(&self) -> usize {
        self.hashes.len() + self.counters.len() + self.zsets.len()
    }

    /// Drop entries whose TTL has elapsed. The programs below also expire
    /// lazily on access; this exists for callers that want to bound memory
    /// proactively (e.g. a periodic background sweep) rather than wait for
    /// the fingerprint to be touched again.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.hashes.retain(|_, v| !v.is_expired(now));
        self.counters.retain(|_, v| !v.is_expired(now));
        self.zsets.retain(|_, v| !v.is_expired(now));
    }
}

impl Default for MemoryKvExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn arg_i64(args: &[KvArg], idx: usize) -> Result<i64, KvError> {
    match args.get(idx) {
        Some(KvArg::Int(v)) => Ok(*v),
        Some(other) => Err(KvError::Protocol(format!(
            "expected integer arg at {idx}, got {other:?}"
        ))),
        None => Err(KvError::Protocol(format!("missing arg at {idx}"))),
    }
}

fn arg_f64(args: &[KvArg], idx: usize) -> Result<f64, KvError> {
    match args.get(idx) {
        Some(KvArg::Real(v)) => Ok(*v),
        Some(KvArg::Int(v)) => Ok(*v as f64),
        Some(other) => Err(KvError::Protocol(format!(
            "expected real arg at {idx}, got {other:?}"
        ))),
        None => Err(KvError::Protocol(format!("missing arg at {idx}"))),
    }
}

fn arg_decimal_str_as_f64(args: &[KvArg], idx: usize) -> Result<f64, KvError> {
    match args.get(idx) {
        Some(KvArg::Str(v)) => v
            .parse()
            .map_err(|_| KvError::Protocol(format!("malformed decimal string at {idx}: {v:?}"))),
        Some(other) => Err(KvError::Protocol(format!(
            "expected decimal string arg at {idx}, got {other:?}"
        ))),
        None => Err(KvError::Protocol(format!("missing arg at {idx}"))),
    }
}

fn arg_str<'a>(args: &'a [KvArg], idx: usize) -> Result<&'a str, KvError> {
    match args.get(idx) {
        Some(KvArg::Str(v)) => Ok(v.as_str()),
        Some(other) => Err(KvError::Protocol(format!(
            "expected string arg at {idx}, got {other:?}"
        ))),
        None => Err(KvError::Protocol(format!("missing arg at {idx}"))),
    }
}

fn single_key<'a>(keys: &[&'a str]) -> Result<&'a str, KvError> {
    keys.first()
        .copied()
        .ok_or_else(|| KvError::Protocol("atomic program requires one key".into()))
}

#[async_trait]
impl KvExecutor for MemoryKvExecutor {
    async fn eval(&self, program: Program, keys: &[&str], args: &[KvArg]) -> Result<KvTuple, KvError> {
        let key = single_key(keys)?;
        trace!(?program, key, "memory kv: eval");

        match program {
            Program::TokenBucket => {
                let capacity = arg_i64(args, 0)? as f64;
                let refill_rate = arg_f64(args, 1)?;
                let cost = arg_i64(args, 2)? as f64;
                let now = arg_decimal_str_as_f64(args, 3)?;

                let mut entry = self
                    .hashes
                    .entry(key.to_string())
                    .or_insert_with(|| Expiring::fresh(HashMap::new()));
                if entry.is_expired(Instant::now()) {
                    entry.value.clear();
                }

                let stored_tokens = entry.value.get("tokens").and_then(|s| s.parse::<f64>().ok());
                let stored_last_refill = entry
                    .value
                    .get("last_refill")
                    .and_then(|s| s.parse::<f64>().ok());

                let (mut tokens, last_refill) = match (stored_tokens, stored_last_refill) {
                    (Some(t), Some(l)) => (t, l),
                    _ => (capacity, now),
                };

                let elapsed = (now - last_refill).max(0.0);
                tokens = (tokens + elapsed * refill_rate).min(capacity);

                let (allowed, retry_after) = if tokens >= cost {
                    tokens -= cost;
                    (1i64, 0i64)
                } else {
                    let deficit = cost - tokens;
                    let retry = if refill_rate > 0.0 {
                        (deficit / refill_rate).ceil() as i64
                    } else {
                        i64::MAX
                    };
                    (0i64, retry)
                };

                entry.value.insert("tokens".into(), tokens.to_string());
                entry.value.insert("last_refill".into(), now.to_string());
                entry.set_ttl(IDLE_TTL);

                Ok(vec![
                    KvValue::Int(allowed),
                    KvValue::Real(tokens),
                    KvValue::Int(retry_after),
                ])
            }

            Program::FixedWindow => {
                let ttl_secs = arg_i64(args, 0)?.max(0) as u64;

                let mut entry = self
                    .counters
                    .entry(key.to_string())
                    .or_insert_with(|| Expiring::fresh(0));
                if entry.is_expired(Instant::now()) {
                    entry.value = 0;
                    entry.expires_at = None;
                }

                entry.value += 1;
                if entry.expires_at.is_none() {
                    entry.set_ttl(Duration::from_secs(ttl_secs));
                }

                Ok(vec![KvValue::Int(entry.value)])
            }

            Program::SlidingWindow => {
                let window_start = arg_decimal_str_as_f64(args, 0)?;
                let now = arg_decimal_str_as_f64(args, 1)?;
                let limit = arg_i64(args, 2)?;
                let request_id = arg_str(args, 3)?;
                let window = arg_i64(args, 4)?;

                let mut entry = self
                    .zsets
                    .entry(key.to_string())
                    .or_insert_with(|| Expiring::fresh(Vec::new()));
                if entry.is_expired(Instant::now()) {
                    entry.value.clear();
                }

                entry.value.retain(|(_, score)| *score > window_start);
                // A member reused verbatim (§4.4) overwrites its score in
                // place rather than adding a second entry, matching ZADD.
                let existing = entry.value.iter().position(|(id, _)| id == request_id);
                let count = entry.value.len() as i64;

                if count < limit {
                    match existing {
                        Some(i) => entry.value[i].1 = now,
                        None => entry.value.push((request_id.to_string(), now)),
                    }
                    entry
                        .value
                        .sort_by(|a, b| a.1.partial_cmp(&b.1).expect("scores are finite"));
                    entry.set_ttl(IDLE_TTL);
                    let new_count = entry.value.len() as i64;
                    Ok(vec![
                        KvValue::Int(1),
                        KvValue::Int((limit - new_count).max(0)),
                        KvValue::Int(0),
                    ])
                } else {
                    let t_oldest = entry.value.first().map(|(_, s)| *s).unwrap_or(now);
                    let retry_after = ((t_oldest + window as f64 - now).ceil() as i64).max(1);
                    Ok(vec![KvValue::Int(0), KvValue::Int(0), KvValue::Int(retry_after)])
                }
            }
        }
    }

    async fn hash_read_all(&self, key: &str) -> Result<HashMap<String, String>, KvError> {
        let now = Instant::now();
        match self.hashes.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(entry.value.clone()),
            _ => Ok(HashMap::new()),
        }
    }

    async fn sorted_set_range_with_scores(&self, key: &str) -> Result<Vec<(String, f64)>, KvError> {
        let now = Instant::now();
        match self.zsets.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(entry.value.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn ping(&self) -> Result<(), KvError> {
        Ok(())
    }
}
