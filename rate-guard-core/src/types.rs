//! The ephemeral request/response shapes that cross the dispatcher
//! boundary (§3). These never touch the KV store directly.

use std::fmt;
use std::str::FromStr;

/// Which atomic program a decision is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    TokenBucket,
    FixedWindow,
    SlidingWindow,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::TokenBucket
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::TokenBucket => "token_bucket",
            Algorithm::FixedWindow => "fixed_window",
            Algorithm::SlidingWindow => "sliding_window",
        })
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token_bucket" => Ok(Algorithm::TokenBucket),
            "fixed_window" => Ok(Algorithm::FixedWindow),
            "sliding_window" => Ok(Algorithm::SlidingWindow),
            other => Err(format!("unknown algorithm: {other}")),
        }
    }
}

/// A decision request before validation. `algorithm` defaults to
/// `token_bucket` and `cost` defaults to 1 when absent, per §4.1.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    pub fingerprint: String,
    pub limit: i64,
    pub window: i64,
    pub algorithm: Option<String>,
    pub cost: Option<i64>,
    pub request_id: Option<String>,
}

impl DecisionRequest {
    pub fn new(fingerprint: impl Into<String>, limit: i64, window: i64) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            limit,
            window,
            algorithm: None,
            cost: None,
            request_id: None,
        }
    }

    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    pub fn cost(mut self, cost: i64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Sliding window only (§4.4): use this id verbatim as the zset member
    /// instead of generating one. Ignored by the other two algorithms.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// A validated, normalized request an engine actually operates on.
#[derive(Debug, Clone)]
pub(crate) struct NormalizedRequest {
    pub fingerprint: String,
    pub limit: u64,
    pub window: u64,
    pub algorithm: Algorithm,
    pub cost: u64,
    pub request_id: Option<String>,
}

/// The response every algorithm engine (and the dispatcher's fail-open
/// path) produces (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionResponse {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_time: u64,
    pub retry_after: Option<u64>,
    pub algorithm: Algorithm,
    pub tokens: Option<f64>,
}

impl DecisionResponse {
    pub(crate) fn admit(remaining: u64, reset_time: u64, algorithm: Algorithm) -> Self {
        Self {
            allowed: true,
            remaining,
            reset_time,
            retry_after: None,
            algorithm,
            tokens: None,
        }
    }

    pub(crate) fn deny(reset_time: u64, retry_after: u64, algorithm: Algorithm) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_time,
            retry_after: Some(retry_after),
            algorithm,
            tokens: None,
        }
    }

    pub(crate) fn with_tokens(mut self, tokens: f64) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// The fail-open response per §4.1/§7: admit, `remaining = limit - 1`,
    /// `retry_after = 0`.
    pub(crate) fn fail_open(req: &NormalizedRequest, now: f64) -> Self {
        Self {
            allowed: true,
            remaining: req.limit.saturating_sub(1),
            reset_time: (now as u64).saturating_add(req.window),
            retry_after: None,
            algorithm: req.algorithm,
            tokens: None,
        }
    }
}
