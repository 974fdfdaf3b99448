//! Worker configuration loaded from environment variables.
//!
//! All settings are read once at process start and are immutable
//! afterwards; components receive the config (or the relevant budget)
//! by reference and never consult the environment themselves.

use std::path::PathBuf;
use std::time::Duration;

/// A `(max_attempts, delay)` pair bounding how long a probing or
/// polling loop may run. There is no wall-clock deadline independent
/// of the attempt count.
#[derive(Debug, Clone, Copy)]
pub struct AttemptBudget {
    /// Maximum number of sequential attempts before giving up.
    pub max_attempts: u32,
    /// Pause between attempts (after a failed attempt, not after success).
    pub delay: Duration,
}

impl AttemptBudget {
    /// Convenience constructor used by tests and `from_env`.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Process-wide worker configuration.
///
/// All fields have defaults suitable for a local ComfyUI instance.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Render server `host:port` (default: `127.0.0.1:8188`).
    pub comfy_api_host: String,
    /// Budget for the completion poller (default: 100 attempts, 5s delay).
    pub poll: AttemptBudget,
    /// Budget for the readiness prober (default: 10 attempts, 2s delay).
    /// Deliberately independent of the poll budget.
    pub probe: AttemptBudget,
    /// Root directory the render server writes images under
    /// (default: `comfyui/output`).
    pub output_root: PathBuf,
    /// Path of the workflow template submitted with each job
    /// (default: `workflows/example_workflow-api.json`).
    pub template_path: PathBuf,
    /// Hub repository that finished artifacts are uploaded to.
    pub hf_repo: String,
    /// Bind address for the hosting shim (default: `0.0.0.0`).
    pub host: String,
    /// Bind port for the hosting shim (default: `3000`).
    pub port: u16,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                              |
    /// |---------------------------|--------------------------------------|
    /// | `COMFY_API_HOST`          | `127.0.0.1:8188`                     |
    /// | `COMFY_API_MAX_ATTEMPTS`  | `100`                                |
    /// | `COMFY_API_DELAY_SECS`    | `5`                                  |
    /// | `COMFY_PROBE_ATTEMPTS`    | `10`                                 |
    /// | `COMFY_PROBE_DELAY_SECS`  | `2`                                  |
    /// | `COMFY_OUTPUT_PATH`       | `comfyui/output`                     |
    /// | `WORKFLOW_TEMPLATE_PATH`  | `workflows/example_workflow-api.json`|
    /// | `HF_REPO_UPLOAD`          | `notkenski/inferences`               |
    /// | `HOST`                    | `0.0.0.0`                            |
    /// | `PORT`                    | `3000`                               |
    pub fn from_env() -> Self {
        let comfy_api_host =
            std::env::var("COMFY_API_HOST").unwrap_or_else(|_| "127.0.0.1:8188".into());

        let poll = AttemptBudget::new(
            env_u32("COMFY_API_MAX_ATTEMPTS", 100),
            Duration::from_secs(env_u64("COMFY_API_DELAY_SECS", 5)),
        );

        let probe = AttemptBudget::new(
            env_u32("COMFY_PROBE_ATTEMPTS", 10),
            Duration::from_secs(env_u64("COMFY_PROBE_DELAY_SECS", 2)),
        );

        let output_root = PathBuf::from(
            std::env::var("COMFY_OUTPUT_PATH").unwrap_or_else(|_| "comfyui/output".into()),
        );

        let template_path = PathBuf::from(
            std::env::var("WORKFLOW_TEMPLATE_PATH")
                .unwrap_or_else(|_| "workflows/example_workflow-api.json".into()),
        );

        let hf_repo =
            std::env::var("HF_REPO_UPLOAD").unwrap_or_else(|_| "notkenski/inferences".into());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        Self {
            comfy_api_host,
            poll,
            probe,
            output_root,
            template_path,
            hf_repo,
            host,
            port,
        }
    }

    /// Base HTTP URL of the render server, e.g. `http://127.0.0.1:8188`.
    pub fn api_base_url(&self) -> String {
        format!("http://{}", self.comfy_api_host)
    }
}

fn env_u32(var: &str, default: u32) -> u32 {
    std::env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{var} must be a valid u32"))
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{var} must be a valid u64"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
