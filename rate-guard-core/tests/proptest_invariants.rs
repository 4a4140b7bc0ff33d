//! Property-based invariant tests for the three engines (§8), run against
//! the in-memory KV executor. `decide` is async; each case drives its own
//! single-threaded runtime since proptest's closures are synchronous.

use std::str::FromStr;
use std::sync::Arc;

use proptest::prelude::*;
use rate_guard_core::{Algorithm, DecisionRequest, Dispatcher, MemoryKvExecutor};

struct FixedClock(std::sync::Mutex<f64>);

impl rate_guard_core::Clock for FixedClock {
    fn now(&self) -> f64 {
        *self.0.lock().unwrap()
    }
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

fn arb_capacity() -> impl Strategy<Value = i64> {
    1i64..200
}

fn arb_window() -> impl Strategy<Value = i64> {
    1i64..120
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Token bucket: `tokens` never exceeds capacity and admitted count over
    /// one instant never exceeds capacity, regardless of capacity/window.
    #[test]
    fn token_bucket_never_exceeds_capacity(capacity in arb_capacity(), window in arb_window()) {
        block_on(async {
            let clock = Arc::new(FixedClock(std::sync::Mutex::new(0.0)));
            let dispatcher = Dispatcher::new(Arc::new(MemoryKvExecutor::new()), clock.clone());

            let mut admitted = 0;
            for _ in 0..(capacity + 5) {
                let req = DecisionRequest::new("prop-tb", capacity, window).algorithm("token_bucket");
                let resp = dispatcher.decide(req).await.unwrap();
                if resp.allowed {
                    admitted += 1;
                    prop_assert!(resp.tokens.unwrap() <= capacity as f64 + 1e-9);
                    prop_assert!(resp.tokens.unwrap() >= -1e-9);
                }
            }
            prop_assert!(admitted <= capacity);
            Ok(())
        })?;
    }

    /// Fixed window: admitted count within one window never exceeds the limit.
    #[test]
    fn fixed_window_ceiling_holds(limit in arb_capacity(), window in arb_window()) {
        block_on(async {
            let clock = Arc::new(FixedClock(std::sync::Mutex::new(0.0)));
            let dispatcher = Dispatcher::new(Arc::new(MemoryKvExecutor::new()), clock.clone());

            let mut admitted = 0;
            for _ in 0..(limit + 5) {
                let req = DecisionRequest::new("prop-fw", limit, window).algorithm("fixed_window");
                let resp = dispatcher.decide(req).await.unwrap();
                if resp.allowed {
                    admitted += 1;
                }
            }
            prop_assert!(admitted <= limit);
            Ok(())
        })?;
    }

    /// Sliding window: admitted count within the trailing interval never
    /// exceeds the limit, and denial never mutates state (admitted count
    /// stays the same after a run of denials).
    #[test]
    fn sliding_window_ceiling_holds(limit in arb_capacity(), window in arb_window()) {
        block_on(async {
            let clock = Arc::new(FixedClock(std::sync::Mutex::new(0.0)));
            let dispatcher = Dispatcher::new(Arc::new(MemoryKvExecutor::new()), clock.clone());

            let mut admitted = 0;
            for _ in 0..(limit + 5) {
                let req = DecisionRequest::new("prop-sw", limit, window).algorithm("sliding_window");
                let resp = dispatcher.decide(req).await.unwrap();
                if resp.allowed {
                    admitted += 1;
                }
            }
            prop_assert!(admitted <= limit);
            Ok(())
        })?;
    }

    /// Fail-open: with the KV executor forced to error, every decision
    /// admits with `remaining = limit - 1`, regardless of algorithm/limit.
    #[test]
    fn fail_open_always_admits(limit in arb_capacity(), window in arb_window()) {
        block_on(async {
            let clock = Arc::new(FixedClock(std::sync::Mutex::new(0.0)));
            let dispatcher = Dispatcher::new(Arc::new(AlwaysErrorsKv), clock.clone());

            for algorithm in ["token_bucket", "fixed_window", "sliding_window"] {
                let req = DecisionRequest::new("prop-fail-open", limit, window).algorithm(algorithm);
                let resp = dispatcher.decide(req).await.unwrap();
                prop_assert!(resp.allowed);
                prop_assert_eq!(resp.remaining, (limit - 1) as u64);
                prop_assert_eq!(resp.algorithm, Algorithm::from_str(algorithm).unwrap());
            }
            Ok(())
        })?;
    }
}

struct AlwaysErrorsKv;

#[async_trait::async_trait]
impl rate_guard_core::KvExecutor for AlwaysErrorsKv {
    async fn eval(
        &self,
        _program: rate_guard_core::Program,
        _keys: &[&str],
        _args: &[rate_guard_core::KvArg],
    ) -> Result<rate_guard_core::KvTuple, rate_guard_core::KvError> {
        Err(rate_guard_core::KvError::Connection("forced".into()))
    }

    async fn hash_read_all(
        &self,
        _key: &str,
    ) -> Result<std::collections::HashMap<String, String>, rate_guard_core::KvError> {
        Err(rate_guard_core::KvError::Connection("forced".into()))
    }

    async fn sorted_set_range_with_scores(
        &self,
        _key: &str,
    ) -> Result<Vec<(String, f64)>, rate_guard_core::KvError> {
        Err(rate_guard_core::KvError::Connection("forced".into()))
    }

    async fn ping(&self) -> Result<(), rate_guard_core::KvError> {
        Err(rate_guard_core::KvError::Connection("forced".into()))
    }
}
