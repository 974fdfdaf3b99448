//! HTTP hosting shim for the job handler.
//!
//! Stands in for the serverless runtime's dispatch: one `POST /invoke`
//! request is one job, answered synchronously with the job's terminal
//! [`JobResult`]. Job failures are data, not transport failures -- the
//! route answers 200 either way.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use renderlet_comfyui::ComfyUIApi;
use renderlet_core::config::WorkerConfig;
use renderlet_core::job::JobResult;
use renderlet_storage::ArtifactStore;

use crate::handler;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WorkerConfig>,
    pub api: Arc<ComfyUIApi>,
    pub store: Arc<dyn ArtifactStore>,
}

/// The serverless invocation envelope: the job input rides under an
/// `input` key, absent when the runtime passes nothing.
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    #[serde(default)]
    pub input: Option<serde_json::Value>,
}

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// GET /health -- liveness of the worker shim itself (not the render
/// server; that has its own prober).
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /invoke -- run one job to completion and return its result.
async fn invoke(State(state): State<AppState>, Json(request): Json<InvokeRequest>) -> Json<JobResult> {
    let result = handler::handle_job(
        &state.config,
        &state.api,
        state.store.as_ref(),
        request.input,
    )
    .await;

    Json(result)
}

/// Build the full application router, middleware included.
pub fn app(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/health", get(health_check))
        .route("/invoke", post(invoke))
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: a panicking job must not take the worker down.
        .layer(CatchPanicLayer::new())
        // Propagate request ID to response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state)
}
