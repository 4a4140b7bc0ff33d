//! Façade configuration (§10.3): listen port and which `KvExecutor` backend
//! to wire up, both environment-driven following the builder-plus-`from_env`
//! convention used elsewhere in the workspace.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

fn default_decide_timeout() -> Duration {
    Duration::from_millis(250)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Redis,
}

impl Default for StoreKind {
    fn default() -> Self {
        StoreKind::Memory
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StoreKind::Memory),
            "redis" => Ok(StoreKind::Redis),
            other => Err(format!("unknown RATE_GUARD_STORE value: {other}")),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreKind::Memory => "memory",
            StoreKind::Redis => "redis",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub store: StoreKind,
    /// Per-request deadline wrapped around `Dispatcher::decide` (§5). An
    /// elapsed deadline is treated as a KV fault and fails open (§7).
    pub decide_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            store: StoreKind::default(),
            decide_timeout: default_decide_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let store = std::env::var("RATE_GUARD_STORE")
            .ok()
            .and_then(|v| StoreKind::from_str(&v).ok())
            .unwrap_or_default();

        let decide_timeout = std::env::var("RATE_GUARD_DECIDE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(default_decide_timeout);

        Self { port, store, decide_timeout }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_store_is_memory() {
        assert_eq!(ServerConfig::default().store, StoreKind::Memory);
    }

    #[test]
    fn default_decide_timeout_is_250ms() {
        assert_eq!(ServerConfig::default().decide_timeout, Duration::from_millis(250));
    }

    #[test]
    fn unknown_store_kind_is_rejected() {
        assert!(StoreKind::from_str("leaky").is_err());
    }
}
