//! Error taxonomy for the decision engine (§7).

use crate::kv::KvError;
use thiserror::Error;

/// Result type returned by the dispatcher and by each algorithm engine.
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// The two error categories the core itself can produce. "Protocol
/// violation" and "KV transient fault" are both represented by `Kv` — the
/// dispatcher's fail-open handling does not need to tell them apart, only
/// the KV adapter's own error needs to (see `KvError`). "Shell error" is
/// out of scope for the core; the façade maps its own failures directly to
/// a transport status code.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Malformed request: empty fingerprint, non-positive limit/window/cost,
    /// or an unrecognized algorithm name. No KV interaction occurs.
    #[error("invalid request: {0}")]
    Input(String),

    /// The KV executor failed or returned something the engine could not
    /// interpret. The dispatcher fails open on this variant.
    #[error("kv store error: {0}")]
    Kv(#[from] KvError),
}

impl RateLimitError {
    pub fn input(msg: impl Into<String>) -> Self {
        RateLimitError::Input(msg.into())
    }

    /// True for the category the dispatcher fails open on.
    pub fn is_kv_fault(&self) -> bool {
        matches!(self, RateLimitError::Kv(_))
    }
}
