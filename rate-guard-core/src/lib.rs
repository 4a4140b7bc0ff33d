//! # Rate Guard Core
//!
//! The decision engine behind a distributed rate-limiting service: token
//! bucket, fixed window, and sliding window algorithms, each expressed as a
//! single atomic program run against a shared [`KvExecutor`], with a
//! fail-open policy when that store is unreachable.
//!
//! This crate knows nothing about HTTP, connection pooling, or deployment —
//! those are thin shells built on top ([`rate-guard-redis`] implements
//! `KvExecutor` against Redis; `rate-guard-http` is the wire façade). What
//! lives here is the decision: given a fingerprint, a limit, a window, and
//! an algorithm, should this request be admitted?
//!
//! ## Quick start
//!
//! ```
//! use rate_guard_core::{Dispatcher, DecisionRequest, MemoryKvExecutor, SystemClock};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let dispatcher = Dispatcher::new(Arc::new(MemoryKvExecutor::new()), Arc::new(SystemClock));
//!
//! let req = DecisionRequest::new("user:42", 100, 60).algorithm("token_bucket");
//! let response = dispatcher.decide(req).await.unwrap();
//! assert!(response.allowed);
//! # }
//! ```

pub mod algorithms;
pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod introspection;
pub mod kv;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use dispatcher::Dispatcher;
pub use error::{RateLimitError, RateLimitResult};
pub use introspection::{Introspection, SlidingWindowEntry, TokenBucketState};
pub use kv::{KvArg, KvError, KvExecutor, KvTuple, KvValue, MemoryKvExecutor, Program};
pub use types::{Algorithm, DecisionRequest, DecisionResponse};
