//! Read-only state views (§4.5). Never mutates, never invokes an atomic
//! program.

use crate::kv::{KvError, KvExecutor};
use std::sync::Arc;

/// Raw state of a `token_bucket:<fp>` key. `Absent` when the key has never
/// been touched or has expired.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenBucketState {
    Absent,
    Live { tokens: f64, last_refill: f64 },
}

/// One member of a `sliding_window:<fp>` ordered set.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingWindowEntry {
    pub request_id: String,
    pub timestamp: f64,
}

/// Read-only views over per-fingerprint state, for debugging and
/// operational tooling.
pub struct Introspection {
    kv: Arc<dyn KvExecutor>,
}

impl Introspection {
    pub fn new(kv: Arc<dyn KvExecutor>) -> Self {
        Self { kv }
    }

    pub async fn token_bucket(&self, fingerprint: &str) -> Result<TokenBucketState, KvError> {
        let key = format!("token_bucket:{fingerprint}");
        let fields = self.kv.hash_read_all(&key).await?;

        let tokens = fields.get("tokens").and_then(|s| s.parse().ok());
        let last_refill = fields.get("last_refill").and_then(|s| s.parse().ok());

        Ok(match (tokens, last_refill) {
            (Some(tokens), Some(last_refill)) => TokenBucketState::Live { tokens, last_refill },
            _ => TokenBucketState::Absent,
        })
    }

    pub async fn sliding_window(&self, fingerprint: &str) -> Result<Vec<SlidingWindowEntry>, KvError> {
        let key = format!("sliding_window:{fingerprint}");
        let members = self.kv.sorted_set_range_with_scores(&key).await?;

        Ok(members
            .into_iter()
            .map(|(request_id, timestamp)| SlidingWindowEntry { request_id, timestamp })
            .collect())
    }
}
