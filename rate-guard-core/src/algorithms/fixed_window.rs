//! Fixed window engine (§4.3).
//!
//! Implements the stricter, atomic form resolved in §9: one atomic
//! increment plus a conditional TTL, with admission decided from the
//! returned counter value rather than a separate non-atomic GET.

use crate::error::RateLimitResult;
use crate::kv::{KvArg, KvExecutor, Program};
use crate::types::{Algorithm, DecisionResponse, NormalizedRequest};
use std::sync::Arc;

pub struct FixedWindowEngine {
    kv: Arc<dyn KvExecutor>,
}

impl FixedWindowEngine {
    pub fn new(kv: Arc<dyn KvExecutor>) -> Self {
        Self { kv }
    }

    pub async fn decide(&self, req: &NormalizedRequest, now: f64) -> RateLimitResult<DecisionResponse> {
        let window_start = (now / req.window as f64).floor() as u64 * req.window;
        let key = format!("fixed_window:{}:{}", req.fingerprint, window_start);

        let args = vec![KvArg::Int(req.window as i64)];
        let result = self.kv.eval(Program::FixedWindow, &[&key], &args).await?;
        let count = result
            .first()
            .ok_or_else(|| crate::kv::KvError::Protocol("fixed window: empty result".into()))?
            .as_i64()?
            .max(0) as u64;

        let reset_time = window_start.saturating_add(req.window);
        let response = if count <= req.limit {
            DecisionResponse::admit(req.limit - count, reset_time, Algorithm::FixedWindow)
        } else {
            DecisionResponse {
                allowed: false,
                remaining: 0,
                reset_time,
                retry_after: None,
                algorithm: Algorithm::FixedWindow,
                tokens: None,
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvExecutor;

    fn req(fingerprint: &str, limit: u64, window: u64) -> NormalizedRequest {
        NormalizedRequest {
            fingerprint: fingerprint.to_string(),
            limit,
            window,
            algorithm: Algorithm::FixedWindow,
            cost: 1,
            request_id: None,
        }
    }

    #[tokio::test]
    async fn window_resets_matches_scenario_s2() {
        let kv: Arc<dyn KvExecutor> = Arc::new(MemoryKvExecutor::new());
        let engine = FixedWindowEngine::new(kv);
        let request = req("s2", 3, 60);

        for expected_remaining in (0..3).rev() {
            let resp = engine.decide(&request, 0.0).await.unwrap();
            assert!(resp.allowed);
            assert_eq!(resp.remaining, expected_remaining);
        }

        let denied = engine.decide(&request, 30.0).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.reset_time, 60);

        let admitted = engine.decide(&request, 60.0).await.unwrap();
        assert!(admitted.allowed);
        assert_eq!(admitted.remaining, 2);
    }

    #[tokio::test]
    async fn no_retry_after_is_reported_on_denial() {
        let kv: Arc<dyn KvExecutor> = Arc::new(MemoryKvExecutor::new());
        let engine = FixedWindowEngine::new(kv);
        let request = req("no-retry", 1, 60);

        engine.decide(&request, 0.0).await.unwrap();
        let denied = engine.decide(&request, 0.0).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, None);
    }
}
