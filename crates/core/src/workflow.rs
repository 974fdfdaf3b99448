//! Workflow template loading and per-job mutation.
//!
//! The workflow document is an opaque, deeply nested JSON mapping
//! (node id -> node definition -> input fields) in the render server's
//! API format. The mutator touches exactly one leaf -- the noise seed
//! of the designated sampler node -- and never alters node topology.
//!
//! The template is re-read from disk on every invocation. Concurrent
//! jobs in one process therefore never share a document, and the
//! on-disk file is never written back.

use std::path::Path;

use serde_json::{Map, Value};

/// Node id of the sampler whose seed is overridden per job.
pub const SEED_NODE_ID: &str = "25";

/// Input field on [`SEED_NODE_ID`] holding the noise seed.
pub const SEED_INPUT_NAME: &str = "noise_seed";

/// Hyperparameter key supplying the replacement seed value.
pub const HYPERPARAM_NOISE_SEED: &str = "noise_seed";

/// Failures while preparing a workflow document.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The template file could not be read or did not parse as JSON.
    #[error("Workflow template unavailable at {path}: {reason}")]
    TemplateUnavailable { path: String, reason: String },

    /// The loaded document does not contain the designated node/field
    /// path, or the hyperparameters carry no seed to write into it.
    #[error("Workflow schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Read and parse the workflow template at `path`.
///
/// Loads fresh on every call -- the document is mutated per job, so
/// caching a parsed copy would leak one job's seed into the next.
pub fn load_template(path: &Path) -> Result<Value, WorkflowError> {
    let raw = std::fs::read_to_string(path).map_err(|e| WorkflowError::TemplateUnavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&raw).map_err(|e| WorkflowError::TemplateUnavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Overwrite the designated seed field with `hyperparams["noise_seed"]`.
///
/// Only the one leaf value changes; every other field of the document
/// is left untouched.
pub fn apply_noise_seed(
    workflow: &mut Value,
    hyperparams: &Map<String, Value>,
) -> Result<(), WorkflowError> {
    let seed = hyperparams.get(HYPERPARAM_NOISE_SEED).ok_or_else(|| {
        WorkflowError::SchemaMismatch(format!(
            "hyperparams is missing the '{HYPERPARAM_NOISE_SEED}' key"
        ))
    })?;

    let inputs = workflow
        .get_mut(SEED_NODE_ID)
        .and_then(|node| node.get_mut("inputs"))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            WorkflowError::SchemaMismatch(format!(
                "template has no node '{SEED_NODE_ID}' with an 'inputs' object"
            ))
        })?;

    let slot = inputs.get_mut(SEED_INPUT_NAME).ok_or_else(|| {
        WorkflowError::SchemaMismatch(format!(
            "node '{SEED_NODE_ID}' has no '{SEED_INPUT_NAME}' input"
        ))
    })?;

    tracing::debug!(
        original_seed = %slot,
        new_seed = %seed,
        "Overriding workflow noise seed",
    );

    *slot = seed.clone();
    Ok(())
}

/// Load the template and apply the job's seed in one step.
pub fn load_and_mutate(
    path: &Path,
    hyperparams: &Map<String, Value>,
) -> Result<Value, WorkflowError> {
    let mut workflow = load_template(path)?;
    apply_noise_seed(&mut workflow, hyperparams)?;
    Ok(workflow)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
