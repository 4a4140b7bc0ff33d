//! The KV executor boundary.
//!
//! Every algorithm engine talks to the shared data store exclusively through
//! [`KvExecutor`]. The trait is deliberately narrow: hash reads for
//! introspection, sorted-set reads for introspection, one atomic program per
//! algorithm, and a liveness check. No engine reaches for a backend-specific
//! type across this line.

mod memory;

pub use memory::MemoryKvExecutor;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The compiled atomic programs an engine may submit. A `KvExecutor`
/// implementation owns the concrete script (Lua text, an in-process match
/// arm, whatever fits the backend) behind each variant; the core only ever
/// names which one it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    TokenBucket,
    FixedWindow,
    SlidingWindow,
}

/// A scalar argument passed to an atomic program. Numbers that need
/// sub-second precision (`now`, window boundaries) are passed as `Str` —
/// see the timestamp representation note in the design notes.
#[derive(Debug, Clone, PartialEq)]
pub enum KvArg {
    Int(i64),
    Real(f64),
    Str(String),
}

impl From<i64> for KvArg {
    fn from(v: i64) -> Self {
        KvArg::Int(v)
    }
}

impl From<f64> for KvArg {
    fn from(v: f64) -> Self {
        KvArg::Real(v)
    }
}

impl From<String> for KvArg {
    fn from(v: String) -> Self {
        KvArg::Str(v)
    }
}

impl From<&str> for KvArg {
    fn from(v: &str) -> Self {
        KvArg::Str(v.to_string())
    }
}

impl fmt::Display for KvArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvArg::Int(v) => write!(f, "{v}"),
            KvArg::Real(v) => write!(f, "{v}"),
            KvArg::Str(v) => write!(f, "{v}"),
        }
    }
}

/// A scalar value returned by an atomic program. Self-describing per §6 —
/// the adapter normalizes whatever the backend hands back into one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum KvValue {
    Int(i64),
    Real(f64),
    Str(String),
}

impl KvValue {
    pub fn as_i64(&self) -> Result<i64, KvError> {
        match self {
            KvValue::Int(v) => Ok(*v),
            KvValue::Real(v) => Ok(*v as i64),
            KvValue::Str(v) => v
                .parse()
                .map_err(|_| KvError::Protocol(format!("expected integer, got {v:?}"))),
        }
    }

    pub fn as_f64(&self) -> Result<f64, KvError> {
        match self {
            KvValue::Int(v) => Ok(*v as f64),
            KvValue::Real(v) => Ok(*v),
            KvValue::Str(v) => v
                .parse()
                .map_err(|_| KvError::Protocol(format!("expected real, got {v:?}"))),
        }
    }

    pub fn as_str(&self) -> Result<&str, KvError> {
        match self {
            KvValue::Str(v) => Ok(v.as_str()),
            other => Err(KvError::Protocol(format!("expected string, got {other:?}"))),
        }
    }
}

/// The tuple shape every atomic program returns.
pub type KvTuple = Vec<KvValue>;

/// Errors surfaced by a `KvExecutor`. The dispatcher does not distinguish a
/// transient fault from a protocol violation (§7 groups both as "KV
/// transient fault" for fail-open purposes); this enum exists so a backend
/// can still report *why*, for logging.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv connection error: {0}")]
    Connection(String),
    #[error("kv operation timed out")]
    Timeout,
    #[error("kv protocol violation: {0}")]
    Protocol(String),
    #[error("kv error: {0}")]
    Other(String),
}

/// Interface to the shared data store. See §2 and §6 of the design.
#[async_trait]
pub trait KvExecutor: Send + Sync {
    /// Submit an atomic program against the given keys and arguments.
    async fn eval(&self, program: Program, keys: &[&str], args: &[KvArg]) -> Result<KvTuple, KvError>;

    /// Read every field of a hash key. Introspection only.
    async fn hash_read_all(&self, key: &str) -> Result<HashMap<String, String>, KvError>;

    /// Read every member of a sorted set, ordered by score ascending.
    /// Introspection only.
    async fn sorted_set_range_with_scores(&self, key: &str) -> Result<Vec<(String, f64)>, KvError>;

    /// Liveness check.
    async fn ping(&self) -> Result<(), KvError>;
}
