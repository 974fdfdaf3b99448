//! Job request validation and the uniform job result type.
//!
//! The hosting runtime hands the worker one raw job input per
//! invocation: either an already-parsed JSON object or a string that
//! still needs parsing. Validation is a pure function of that input
//! and runs before any network traffic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire name of the LoRA reference field.
pub const FIELD_LORA: &str = "hf_lora";

/// Wire name of the hyperparameter map field.
pub const FIELD_HYPERPARAMS: &str = "hyperparams";

/// A validated job request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Reference to the LoRA the job was trained against. Validated and
    /// logged, but not injected into the workflow document (the template
    /// already names its LoRA loader input).
    pub lora_reference: String,
    /// Generation hyperparameters. Must contain `noise_seed`, consumed
    /// by the workflow mutator.
    pub hyperparameters: Map<String, Value>,
}

/// Validation failures for raw job input.
#[derive(Debug, thiserror::Error)]
pub enum JobInputError {
    /// No input was provided at all.
    #[error("Job input is not provided")]
    Missing,

    /// A string input did not parse as JSON.
    #[error("Job input is not valid JSON")]
    Malformed,

    /// A required field is absent or null.
    #[error("Missing required field '{0}': both hf_lora and hyperparams must be provided")]
    MissingField(&'static str),
}

/// Validate a raw job input into a [`JobRequest`].
///
/// Accepts either a JSON object or a JSON string encoding one. Pure:
/// no side effects, no downstream component is touched on failure.
pub fn validate_job_input(input: Option<Value>) -> Result<JobRequest, JobInputError> {
    let raw = input.ok_or(JobInputError::Missing)?;

    // String payloads are re-parsed into structured input first.
    let parsed = match raw {
        Value::String(text) => serde_json::from_str(&text).map_err(|_| JobInputError::Malformed)?,
        other => other,
    };

    let lora_reference = match parsed.get(FIELD_LORA) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => return Err(JobInputError::MissingField(FIELD_LORA)),
        Some(other) => other.to_string(),
    };

    let hyperparameters = match parsed.get(FIELD_HYPERPARAMS) {
        Some(Value::Object(map)) => map.clone(),
        _ => return Err(JobInputError::MissingField(FIELD_HYPERPARAMS)),
    };

    Ok(JobRequest {
        lora_reference,
        hyperparameters,
    })
}

// ---------------------------------------------------------------------------
// Job result
// ---------------------------------------------------------------------------

/// Terminal status of one job invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Error,
}

/// The one result returned per job, success or error. Never partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// Whether the job produced and delivered an artifact.
    pub status: JobStatus,
    /// Human-readable outcome description.
    pub message: String,
    /// Instructs the hosting runtime to recycle the worker process
    /// after this job. Set on success; passed through untouched.
    pub refresh_worker: bool,
}

impl JobResult {
    /// A successful result. Always requests a worker refresh.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Success,
            message: message.into(),
            refresh_worker: true,
        }
    }

    /// A failed result carrying the stage-specific message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            message: message.into(),
            refresh_worker: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
