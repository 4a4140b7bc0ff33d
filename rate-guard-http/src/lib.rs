//! HTTP façade for the rate-limiting decision service. Decodes/encodes the
//! wire shapes of §6, binds the dispatcher and introspection to routes, and
//! exposes a liveness probe. Holds no policy of its own.

pub mod config;
mod routes;
mod wire;

use std::sync::Arc;
use std::time::Duration;

use rate_guard_core::{Clock, Dispatcher, Introspection, KvExecutor};

pub use config::{ServerConfig, StoreKind};
pub use routes::{router, AppState};

/// Assemble the façade's router from a KV backend and clock, using the
/// default per-request decide deadline (§5/§10.3). Split out from `main` so
/// integration tests can build the same router against an in-process KV
/// executor.
pub fn build_app(kv: Arc<dyn KvExecutor>, clock: Arc<dyn Clock>) -> axum::Router {
    build_app_with_timeout(kv, clock, ServerConfig::default().decide_timeout)
}

/// Same as [`build_app`], with an explicit decide deadline instead of the
/// default.
pub fn build_app_with_timeout(
    kv: Arc<dyn KvExecutor>,
    clock: Arc<dyn Clock>,
    decide_timeout: Duration,
) -> axum::Router {
    let dispatcher = Arc::new(Dispatcher::new(kv.clone(), clock));
    let introspection = Arc::new(Introspection::new(kv.clone()));
    router(AppState {
        dispatcher,
        introspection,
        kv,
        decide_timeout,
    })
}
