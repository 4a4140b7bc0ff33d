//! Sliding window engine (§4.4).

use crate::clock::{format_timestamp, RequestIdGenerator};
use crate::error::RateLimitResult;
use crate::kv::{KvArg, KvExecutor, Program};
use crate::types::{Algorithm, DecisionResponse, NormalizedRequest};
use std::sync::Arc;

pub struct SlidingWindowEngine {
    kv: Arc<dyn KvExecutor>,
    request_ids: RequestIdGenerator,
}

impl SlidingWindowEngine {
    pub fn new(kv: Arc<dyn KvExecutor>) -> Self {
        Self {
            kv,
            request_ids: RequestIdGenerator::new(),
        }
    }

    pub async fn decide(&self, req: &NormalizedRequest, now: f64) -> RateLimitResult<DecisionResponse> {
        let key = format!("sliding_window:{}", req.fingerprint);
        let window_start = now - req.window as f64;
        let request_id = match &req.request_id {
            Some(id) => id.clone(),
            None => self.request_ids.next_id(now),
        };

        let args = vec![
            KvArg::Str(format_timestamp(window_start)),
            KvArg::Str(format_timestamp(now)),
            KvArg::Int(req.limit as i64),
            KvArg::Str(request_id),
            KvArg::Int(req.window as i64),
        ];

        let result = self.kv.eval(Program::SlidingWindow, &[&key], &args).await?;
        let allowed = result
            .first()
            .ok_or_else(|| crate::kv::KvError::Protocol("sliding window: empty result".into()))?
            .as_i64()?
            == 1;
        let remaining = result
            .get(1)
            .ok_or_else(|| crate::kv::KvError::Protocol("sliding window: missing remaining".into()))?
            .as_i64()?
            .max(0) as u64;
        let retry_after = result
            .get(2)
            .ok_or_else(|| crate::kv::KvError::Protocol("sliding window: missing retry_after".into()))?
            .as_i64()?
            .max(0) as u64;

        let reset_time = (now as u64).saturating_add(req.window);
        let response = if allowed {
            DecisionResponse::admit(remaining, reset_time, Algorithm::SlidingWindow)
        } else {
            DecisionResponse::deny(reset_time, retry_after, Algorithm::SlidingWindow)
        };
        Ok(response)
    }
}
