//! Decision dispatcher (§4.1): validates, applies defaults, dispatches by
//! algorithm, and owns the fail-open policy.

use crate::algorithms::{FixedWindowEngine, SlidingWindowEngine, TokenBucketEngine};
use crate::clock::Clock;
use crate::error::{RateLimitError, RateLimitResult};
use crate::kv::KvExecutor;
use crate::types::{Algorithm, DecisionRequest, DecisionResponse, NormalizedRequest};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Selects one of the three engines by algorithm name and applies the
/// fail-open policy around all of them. Holds no per-fingerprint state;
/// the KV handle and clock are shared across engines, per the design note
/// that engines carry no mutable state beyond their compiled program.
pub struct Dispatcher {
    clock: Arc<dyn Clock>,
    token_bucket: TokenBucketEngine,
    fixed_window: FixedWindowEngine,
    sliding_window: SlidingWindowEngine,
}

impl Dispatcher {
    pub fn new(kv: Arc<dyn KvExecutor>, clock: Arc<dyn Clock>) -> Self {
        Self {
            token_bucket: TokenBucketEngine::new(kv.clone()),
            fixed_window: FixedWindowEngine::new(kv.clone()),
            sliding_window: SlidingWindowEngine::new(kv),
            clock,
        }
    }

    /// `decide(req) → DecisionResponse`. Never returns `Err` for a KV
    /// fault — that path fails open (§4.1/§7); `Err` is reserved for input
    /// validation failures. The host clock is read exactly once here and
    /// threaded through to whichever engine is selected (§5).
    pub async fn decide(&self, req: DecisionRequest) -> RateLimitResult<DecisionResponse> {
        let normalized = self.validate(req)?;
        let now = self.clock.now();
        Ok(self.dispatch(&normalized, now).await)
    }

    /// `decide`, but the KV round trip is bounded by `deadline` (§5). A
    /// deadline exceeded is a KV fault and fails open the same way any
    /// other KV fault does (§7) — it never surfaces as `Err`.
    pub async fn decide_with_deadline(
        &self,
        req: DecisionRequest,
        deadline: Duration,
    ) -> RateLimitResult<DecisionResponse> {
        let normalized = self.validate(req)?;
        let now = self.clock.now();

        match tokio::time::timeout(deadline, self.dispatch(&normalized, now)).await {
            Ok(response) => Ok(response),
            Err(_) => {
                warn!(
                    fingerprint = %normalized.fingerprint,
                    algorithm = %normalized.algorithm,
                    deadline_ms = deadline.as_millis() as u64,
                    "decide deadline exceeded, failing open"
                );
                Ok(DecisionResponse::fail_open(&normalized, now))
            }
        }
    }

    async fn dispatch(&self, normalized: &NormalizedRequest, now: f64) -> DecisionResponse {
        let outcome = match normalized.algorithm {
            Algorithm::TokenBucket => self.token_bucket.decide(normalized, now).await,
            Algorithm::FixedWindow => self.fixed_window.decide(normalized, now).await,
            Algorithm::SlidingWindow => self.sliding_window.decide(normalized, now).await,
        };

        match outcome {
            Ok(response) => {
                debug!(
                    fingerprint = %normalized.fingerprint,
                    algorithm = %normalized.algorithm,
                    allowed = response.allowed,
                    "decision"
                );
                response
            }
            Err(fault) => {
                error!(
                    fingerprint = %normalized.fingerprint,
                    algorithm = %normalized.algorithm,
                    error = %fault,
                    "kv fault, failing open"
                );
                DecisionResponse::fail_open(normalized, now)
            }
        }
    }

    fn validate(&self, req: DecisionRequest) -> RateLimitResult<NormalizedRequest> {
        if req.fingerprint.trim().is_empty() {
            return Err(RateLimitError::input("fingerprint must not be empty"));
        }
        if req.limit <= 0 {
            return Err(RateLimitError::input("limit must be positive"));
        }
        if req.window <= 0 {
            return Err(RateLimitError::input("window must be positive"));
        }
        let cost = req.cost.unwrap_or(1);
        if cost <= 0 {
            return Err(RateLimitError::input("cost must be positive"));
        }
        let algorithm = match req.algorithm {
            Some(name) => Algorithm::from_str(&name).map_err(RateLimitError::input)?,
            None => Algorithm::default(),
        };

        if let Some(id) = &req.request_id {
            if id.trim().is_empty() {
                return Err(RateLimitError::input("request_id must not be empty"));
            }
        }

        Ok(NormalizedRequest {
            fingerprint: req.fingerprint,
            limit: req.limit as u64,
            window: req.window as u64,
            algorithm,
            cost: cost as u64,
            request_id: req.request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvError, KvExecutor, KvTuple, KvValue, Program};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct AlwaysErrors;

    #[async_trait]
    impl KvExecutor for AlwaysErrors {
        async fn eval(
            &self,
            _program: Program,
            _keys: &[&str],
            _args: &[crate::kv::KvArg],
        ) -> Result<KvTuple, KvError> {
            Err(KvError::Connection("simulated outage".into()))
        }

        async fn hash_read_all(&self, _key: &str) -> Result<HashMap<String, String>, KvError> {
            Err(KvError::Connection("simulated outage".into()))
        }

        async fn sorted_set_range_with_scores(&self, _key: &str) -> Result<Vec<(String, f64)>, KvError> {
            Err(KvError::Connection("simulated outage".into()))
        }

        async fn ping(&self) -> Result<(), KvError> {
            Err(KvError::Connection("simulated outage".into()))
        }
    }

    struct FrozenClock;
    impl Clock for FrozenClock {
        fn now(&self) -> f64 {
            0.0
        }
    }

    #[tokio::test]
    async fn fail_open_matches_scenario_s4() {
        let dispatcher = Dispatcher::new(Arc::new(AlwaysErrors), Arc::new(FrozenClock));
        let req = DecisionRequest::new("victim", 100, 60).algorithm("token_bucket");

        let resp = dispatcher.decide(req).await.unwrap();
        assert!(resp.allowed);
        assert_eq!(resp.remaining, 99);
        assert_eq!(resp.retry_after, None);
    }

    #[tokio::test]
    async fn unknown_algorithm_is_an_input_error_matches_scenario_s5() {
        let dispatcher = Dispatcher::new(
            Arc::new(crate::kv::MemoryKvExecutor::new()),
            Arc::new(FrozenClock),
        );
        let req = DecisionRequest::new("caller", 10, 10).algorithm("leaky_bucket");

        let err = dispatcher.decide(req).await.unwrap_err();
        assert!(!err.is_kv_fault());
    }

    #[tokio::test]
    async fn empty_fingerprint_is_rejected() {
        let dispatcher = Dispatcher::new(
            Arc::new(crate::kv::MemoryKvExecutor::new()),
            Arc::new(FrozenClock),
        );
        let req = DecisionRequest::new("", 10, 10);
        assert!(dispatcher.decide(req).await.is_err());
    }

    #[tokio::test]
    async fn non_positive_limit_is_rejected() {
        let dispatcher = Dispatcher::new(
            Arc::new(crate::kv::MemoryKvExecutor::new()),
            Arc::new(FrozenClock),
        );
        let req = DecisionRequest::new("caller", 0, 10);
        assert!(dispatcher.decide(req).await.is_err());
    }

    #[tokio::test]
    async fn default_algorithm_is_token_bucket() {
        let dispatcher = Dispatcher::new(
            Arc::new(crate::kv::MemoryKvExecutor::new()),
            Arc::new(FrozenClock),
        );
        let req = DecisionRequest::new("caller", 10, 10);
        let resp = dispatcher.decide(req).await.unwrap();
        assert_eq!(resp.algorithm, Algorithm::TokenBucket);
    }

    struct SlowKv;

    #[async_trait]
    impl KvExecutor for SlowKv {
        async fn eval(
            &self,
            _program: Program,
            _keys: &[&str],
            _args: &[crate::kv::KvArg],
        ) -> Result<KvTuple, KvError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(vec![KvValue::Int(1), KvValue::Real(9.0), KvValue::Int(0)])
        }

        async fn hash_read_all(&self, _key: &str) -> Result<HashMap<String, String>, KvError> {
            Ok(HashMap::new())
        }

        async fn sorted_set_range_with_scores(&self, _key: &str) -> Result<Vec<(String, f64)>, KvError> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<(), KvError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_exceeded_fails_open_matches_scenario_s4() {
        let dispatcher = Dispatcher::new(Arc::new(SlowKv), Arc::new(FrozenClock));
        let req = DecisionRequest::new("slow-backend", 10, 60).algorithm("token_bucket");

        let resp = dispatcher
            .decide_with_deadline(req, Duration::from_millis(50))
            .await
            .unwrap();

        assert!(resp.allowed);
        assert_eq!(resp.remaining, 9);
        assert_eq!(resp.retry_after, None);
    }

    #[tokio::test]
    async fn deadline_not_exceeded_returns_the_real_decision() {
        let dispatcher = Dispatcher::new(
            Arc::new(crate::kv::MemoryKvExecutor::new()),
            Arc::new(FrozenClock),
        );
        let req = DecisionRequest::new("fast-backend", 10, 60).algorithm("token_bucket");

        let resp = dispatcher
            .decide_with_deadline(req, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(resp.allowed);
        assert_eq!(resp.remaining, 9);
    }
}
