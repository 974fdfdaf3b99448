//! Integration tests for the readiness prober and completion poller
//! against a scripted in-process render server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use renderlet_comfyui::poll::{await_completion, PollError};
use renderlet_comfyui::{probe, ComfyUIApi, ComfyUIApiError};
use renderlet_core::config::AttemptBudget;

/// Scripted behaviour for the fake render server.
struct FakeServer {
    /// Number of `/history` queries received so far.
    history_calls: AtomicU32,
    /// Attempt number on which outputs first appear (`None` = never).
    outputs_on_attempt: Option<u32>,
    /// Whether `GET /` answers 200 (`false` = 503).
    ready: bool,
}

impl FakeServer {
    fn history_response(&self, prompt_id: &str) -> serde_json::Value {
        let call = self.history_calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.outputs_on_attempt {
            Some(k) if call >= k => json!({
                prompt_id: {
                    "outputs": {
                        "40": { "images": [ { "subfolder": "batch", "filename": "img.png" } ] }
                    }
                }
            }),
            _ => json!({}),
        }
    }
}

/// Bind the fake server on an ephemeral port and return a client for it.
async fn spawn_fake_server(fake: Arc<FakeServer>) -> ComfyUIApi {
    let app = Router::new()
        .route(
            "/",
            get(|State(fake): State<Arc<FakeServer>>| async move {
                if fake.ready {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        )
        .route(
            "/history/{id}",
            get(
                |State(fake): State<Arc<FakeServer>>, Path(id): Path<String>| async move {
                    Json(fake.history_response(&id))
                },
            ),
        )
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake server");
    });

    ComfyUIApi::new(format!("http://{addr}"))
}

fn fast_budget(max_attempts: u32) -> AttemptBudget {
    AttemptBudget::new(max_attempts, Duration::from_millis(1))
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poller_returns_outputs_on_first_attempt() {
    let fake = Arc::new(FakeServer {
        history_calls: AtomicU32::new(0),
        outputs_on_attempt: Some(1),
        ready: true,
    });
    let api = spawn_fake_server(Arc::clone(&fake)).await;

    let outputs = await_completion(&api, "abc", &fast_budget(5))
        .await
        .expect("outputs on first attempt");

    assert!(outputs.contains_key("40"));
    assert_eq!(fake.history_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn poller_makes_exactly_k_queries_when_outputs_appear_on_attempt_k() {
    let fake = Arc::new(FakeServer {
        history_calls: AtomicU32::new(0),
        outputs_on_attempt: Some(3),
        ready: true,
    });
    let api = spawn_fake_server(Arc::clone(&fake)).await;

    let outputs = await_completion(&api, "abc", &fast_budget(10))
        .await
        .expect("outputs on attempt 3");

    assert!(outputs.contains_key("40"));
    assert_eq!(fake.history_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn poller_exhausts_after_exactly_max_attempts() {
    let fake = Arc::new(FakeServer {
        history_calls: AtomicU32::new(0),
        outputs_on_attempt: None,
        ready: true,
    });
    let api = spawn_fake_server(Arc::clone(&fake)).await;

    let err = await_completion(&api, "abc", &fast_budget(4))
        .await
        .expect_err("outputs never appear");

    assert_matches!(err, PollError::Exhausted { attempts: 4 });
    assert!(err.to_string().contains("maximum number of retries"));
    assert_eq!(fake.history_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn poller_propagates_transport_errors() {
    // Bind then immediately drop a listener so the port refuses connections.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let api = ComfyUIApi::new(format!("http://{addr}"));
    let err = await_completion(&api, "abc", &fast_budget(3))
        .await
        .expect_err("connection refused");

    assert_matches!(err, PollError::Api(ComfyUIApiError::Request(_)));
}

// ---------------------------------------------------------------------------
// Prober
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prober_returns_true_when_server_answers() {
    let fake = Arc::new(FakeServer {
        history_calls: AtomicU32::new(0),
        outputs_on_attempt: None,
        ready: true,
    });
    let api = spawn_fake_server(fake).await;

    assert!(probe::check_server(&api, &fast_budget(3)).await);
}

#[tokio::test]
async fn prober_returns_false_on_persistent_non_200() {
    let fake = Arc::new(FakeServer {
        history_calls: AtomicU32::new(0),
        outputs_on_attempt: None,
        ready: false,
    });
    let api = spawn_fake_server(fake).await;

    assert!(!probe::check_server(&api, &fast_budget(3)).await);
}

#[tokio::test]
async fn prober_returns_false_when_server_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let api = ComfyUIApi::new(format!("http://{addr}"));
    assert!(!probe::check_server(&api, &fast_budget(2)).await);
}
