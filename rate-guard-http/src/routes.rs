//! Route handlers (§6, §4.5). Thin: decode, call the dispatcher or
//! introspection, encode. No policy lives here.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use axum::routing::get;
use rate_guard_core::{Dispatcher, Introspection, KvExecutor, TokenBucketState};
use tracing::warn;

use crate::wire::{
    DecideRequestWire, DecideResponseWire, ErrorWire, HealthWire, SlidingWindowEntryWire,
    TokenBucketStateWire,
};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub introspection: Arc<Introspection>,
    pub kv: Arc<dyn KvExecutor>,
    /// Per-request deadline wrapped around `Dispatcher::decide` (§5).
    pub decide_timeout: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/decide", axum::routing::post(decide))
        .route("/v1/introspect/token_bucket/:fingerprint", get(introspect_token_bucket))
        .route("/v1/introspect/sliding_window/:fingerprint", get(introspect_sliding_window))
        .with_state(state)
}

async fn decide(State(state): State<AppState>, Json(wire): Json<DecideRequestWire>) -> Response {
    match state
        .dispatcher
        .decide_with_deadline(wire.into(), state.decide_timeout)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(DecideResponseWire::from(response))).into_response(),
        Err(err) => {
            (StatusCode::BAD_REQUEST, Json(ErrorWire { error: err.to_string() })).into_response()
        }
    }
}

async fn healthz(State(state): State<AppState>) -> Response {
    match state.kv.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthWire { status: "ok" })).into_response(),
        Err(err) => {
            warn!(error = %err, "healthz: kv store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorWire { error: err.to_string() }),
            )
                .into_response()
        }
    }
}

async fn introspect_token_bucket(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Response {
    match state.introspection.token_bucket(&fingerprint).await {
        Ok(TokenBucketState::Absent) => (
            StatusCode::OK,
            Json(TokenBucketStateWire { state: "absent", tokens: None, last_refill: None }),
        )
            .into_response(),
        Ok(TokenBucketState::Live { tokens, last_refill }) => (
            StatusCode::OK,
            Json(TokenBucketStateWire {
                state: "live",
                tokens: Some(tokens),
                last_refill: Some(last_refill),
            }),
        )
            .into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorWire { error: err.to_string() }),
        )
            .into_response(),
    }
}

async fn introspect_sliding_window(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Response {
    match state.introspection.sliding_window(&fingerprint).await {
        Ok(entries) => {
            let wire: Vec<SlidingWindowEntryWire> = entries
                .into_iter()
                .map(|e| SlidingWindowEntryWire { request_id: e.request_id, timestamp: e.timestamp })
                .collect();
            (StatusCode::OK, Json(wire)).into_response()
        }
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorWire { error: err.to_string() }),
        )
            .into_response(),
    }
}
