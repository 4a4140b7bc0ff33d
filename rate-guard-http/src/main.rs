//! Binary entry point: reads configuration, wires up the chosen KV backend,
//! installs the tracing subscriber, and serves until `SIGTERM`/Ctrl-C.

use std::sync::Arc;

use rate_guard_core::{Clock, KvExecutor, MemoryKvExecutor, SystemClock};
use rate_guard_http::{build_app_with_timeout, ServerConfig, StoreKind};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("RATE_GUARD_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env();

    let kv: Arc<dyn KvExecutor> = match config.store {
        StoreKind::Memory => Arc::new(MemoryKvExecutor::new()),
        StoreKind::Redis => {
            let redis_config = rate_guard_redis::RedisConfig::from_env().build();
            let pool = rate_guard_redis::RedisPoolBuilder::new(redis_config)
                .build()
                .await
                .expect("failed to establish the redis connection pool");
            Arc::new(rate_guard_redis::RedisKvExecutor::new(pool))
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let app = build_app_with_timeout(kv, clock, config.decide_timeout);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!(port = config.port, store = %config.store, "rate-guard-http listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
