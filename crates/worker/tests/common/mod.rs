//! Shared fixtures for worker integration tests: a scripted render
//! server, a recording artifact store, and config/template builders.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use renderlet_comfyui::ComfyUIApi;
use renderlet_core::config::{AttemptBudget, WorkerConfig};
use renderlet_storage::{ArtifactStore, StorageError};

/// Prompt id the fake server assigns to every submission.
pub const FAKE_PROMPT_ID: &str = "abc";

/// Scripted behaviour for the fake render server.
pub struct FakeComfy {
    /// Number of `/prompt` submissions received.
    pub prompt_calls: AtomicU32,
    /// Number of `/history` queries received.
    pub history_calls: AtomicU32,
    /// History attempt on which outputs first appear (`None` = never).
    pub outputs_on_attempt: Option<u32>,
    /// `(subfolder, filename)` of the image the outputs reference.
    pub image: (String, String),
    /// Whether `/prompt` rejects submissions with a 500.
    pub reject_submissions: bool,
    /// Body of the most recent `/prompt` submission.
    pub last_prompt_body: Mutex<Option<Value>>,
}

impl FakeComfy {
    pub fn completing_on_attempt(attempt: u32, subfolder: &str, filename: &str) -> Arc<Self> {
        Arc::new(Self {
            prompt_calls: AtomicU32::new(0),
            history_calls: AtomicU32::new(0),
            outputs_on_attempt: Some(attempt),
            image: (subfolder.to_string(), filename.to_string()),
            reject_submissions: false,
            last_prompt_body: Mutex::new(None),
        })
    }

    pub fn never_completing() -> Arc<Self> {
        Arc::new(Self {
            prompt_calls: AtomicU32::new(0),
            history_calls: AtomicU32::new(0),
            outputs_on_attempt: None,
            image: ("batch".to_string(), "img_001.png".to_string()),
            reject_submissions: false,
            last_prompt_body: Mutex::new(None),
        })
    }

    pub fn rejecting_submissions() -> Arc<Self> {
        Arc::new(Self {
            prompt_calls: AtomicU32::new(0),
            history_calls: AtomicU32::new(0),
            outputs_on_attempt: None,
            image: ("batch".to_string(), "img_001.png".to_string()),
            reject_submissions: true,
            last_prompt_body: Mutex::new(None),
        })
    }
}

/// Bind the fake render server on an ephemeral port, returning a
/// client pointed at it.
pub async fn spawn_comfy(fake: Arc<FakeComfy>) -> ComfyUIApi {
    let app = Router::new()
        .route("/", get(|| async { StatusCode::OK }))
        .route(
            "/prompt",
            post(
                |State(fake): State<Arc<FakeComfy>>, Json(body): Json<Value>| async move {
                    fake.prompt_calls.fetch_add(1, Ordering::SeqCst);
                    if fake.reject_submissions {
                        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})));
                    }
                    *fake.last_prompt_body.lock().await = Some(body);
                    (
                        StatusCode::OK,
                        Json(json!({ "prompt_id": FAKE_PROMPT_ID, "number": 1 })),
                    )
                },
            ),
        )
        .route(
            "/history/{id}",
            get(
                |State(fake): State<Arc<FakeComfy>>, AxumPath(id): AxumPath<String>| async move {
                    let call = fake.history_calls.fetch_add(1, Ordering::SeqCst) + 1;
                    let (subfolder, filename) = &fake.image;
                    match fake.outputs_on_attempt {
                        Some(k) if call >= k => Json(json!({
                            id: {
                                "outputs": {
                                    "40": {
                                        "images": [
                                            { "subfolder": subfolder, "filename": filename }
                                        ]
                                    }
                                }
                            }
                        })),
                        _ => Json(json!({})),
                    }
                },
            ),
        )
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake comfy");
    });

    ComfyUIApi::new(format!("http://{addr}"))
}

/// An in-memory artifact store recording every upload it receives.
#[derive(Default)]
pub struct RecordingStore {
    pub uploads: Mutex<Vec<(PathBuf, String, String)>>,
}

#[async_trait::async_trait]
impl ArtifactStore for RecordingStore {
    async fn upload(
        &self,
        local_path: &Path,
        remote_name: &str,
        repo_id: &str,
    ) -> Result<(), StorageError> {
        self.uploads.lock().await.push((
            local_path.to_path_buf(),
            remote_name.to_string(),
            repo_id.to_string(),
        ));
        Ok(())
    }
}

/// An artifact store that refuses every upload.
pub struct FailingStore;

#[async_trait::async_trait]
impl ArtifactStore for FailingStore {
    async fn upload(&self, _: &Path, _: &str, _: &str) -> Result<(), StorageError> {
        Err(StorageError::Rejected {
            status: 403,
            body: "token lacks write access".to_string(),
        })
    }
}

/// Worker config with millisecond budgets suitable for tests.
pub fn test_config(template_path: PathBuf, output_root: PathBuf) -> WorkerConfig {
    WorkerConfig {
        comfy_api_host: "unused-in-tests".to_string(),
        poll: AttemptBudget::new(3, Duration::from_millis(1)),
        probe: AttemptBudget::new(1, Duration::from_millis(1)),
        output_root,
        template_path,
        hf_repo: "acme/inferences".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

/// Write a minimal workflow template (with the seed node) into `dir`.
pub fn write_template(dir: &Path) -> PathBuf {
    let path = dir.join("workflow-api.json");
    let template = json!({
        "25": { "class_type": "RandomNoise", "inputs": { "noise_seed": 1 } },
        "40": { "class_type": "SaveImage", "inputs": { "filename_prefix": "renderlet" } }
    });
    std::fs::write(&path, template.to_string()).expect("write template");
    path
}

/// A valid job input with the given seed.
pub fn valid_input(seed: u64) -> Value {
    json!({
        "hf_lora": "acme/lora",
        "hyperparams": { "noise_seed": seed }
    })
}
