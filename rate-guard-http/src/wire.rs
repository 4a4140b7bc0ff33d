//! JSON shapes crossing the HTTP boundary (§6). These exist only in this
//! crate — the core never sees serde.

use rate_guard_core::{DecisionRequest, DecisionResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct DecideRequestWire {
    pub key: String,
    pub limit: i64,
    pub window: i64,
    pub algorithm: Option<String>,
    pub tokens: Option<i64>,
    pub request_id: Option<String>,
}

impl From<DecideRequestWire> for DecisionRequest {
    fn from(wire: DecideRequestWire) -> Self {
        let mut req = DecisionRequest::new(wire.key, wire.limit, wire.window);
        if let Some(algorithm) = wire.algorithm {
            req = req.algorithm(algorithm);
        }
        if let Some(cost) = wire.tokens {
            req = req.cost(cost);
        }
        if let Some(request_id) = wire.request_id {
            req = req.request_id(request_id);
        }
        req
    }
}

#[derive(Debug, Serialize)]
pub struct DecideResponseWire {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    pub algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<f64>,
}

impl From<DecisionResponse> for DecideResponseWire {
    fn from(resp: DecisionResponse) -> Self {
        Self {
            allowed: resp.allowed,
            remaining: resp.remaining,
            reset_time: resp.reset_time,
            retry_after: resp.retry_after,
            algorithm: resp.algorithm.to_string(),
            tokens: resp.tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorWire {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthWire {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TokenBucketStateWire {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refill: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SlidingWindowEntryWire {
    pub request_id: String,
    pub timestamp: f64,
}
