//! Token bucket engine (§4.2).

use crate::clock::format_timestamp;
use crate::error::RateLimitResult;
use crate::kv::{KvArg, KvExecutor, Program};
use crate::types::{Algorithm, DecisionResponse, NormalizedRequest};
use std::sync::Arc;

/// Owns no per-fingerprint state; the KV handle is the only constructor
/// input, per the "no ambient singletons" design note. `now` is supplied
/// by the dispatcher, which reads the host clock once per decision.
pub struct TokenBucketEngine {
    kv: Arc<dyn KvExecutor>,
}

impl TokenBucketEngine {
    pub fn new(kv: Arc<dyn KvExecutor>) -> Self {
        Self { kv }
    }

    pub async fn decide(&self, req: &NormalizedRequest, now: f64) -> RateLimitResult<DecisionResponse> {
        let key = format!("token_bucket:{}", req.fingerprint);
        let refill_rate = req.limit as f64 / req.window as f64;

        let args = vec![
            KvArg::Int(req.limit as i64),
            KvArg::Real(refill_rate),
            KvArg::Int(req.cost as i64),
            KvArg::Str(format_timestamp(now)),
        ];

        let result = self.kv.eval(Program::TokenBucket, &[&key], &args).await?;
        let allowed = result
            .first()
            .ok_or_else(|| crate::kv::KvError::Protocol("token bucket: empty result".into()))?
            .as_i64()?
            == 1;
        let tokens = result
            .get(1)
            .ok_or_else(|| crate::kv::KvError::Protocol("token bucket: missing tokens".into()))?
            .as_f64()?;
        let retry_after = result
            .get(2)
            .ok_or_else(|| crate::kv::KvError::Protocol("token bucket: missing retry_after".into()))?
            .as_i64()?;

        let reset_time = (now as u64).saturating_add(req.window);
        let response = if allowed {
            DecisionResponse::admit(tokens.floor() as u64, reset_time, Algorithm::TokenBucket)
        } else {
            DecisionResponse::deny(reset_time, retry_after.max(0) as u64, Algorithm::TokenBucket)
        };
        Ok(response.with_tokens(tokens))
    }
}
