//! The job orchestrator.
//!
//! One invocation walks a fixed sequence of stages: validate input,
//! probe server readiness, mutate the workflow template, submit it,
//! poll for completion, resolve the output artifact, publish it. Any
//! stage failure short-circuits into an error [`JobResult`]; the
//! process itself never dies on a job failure. The orchestrator adds
//! no retries of its own -- only the prober and poller loop, each
//! within its configured budget.

use serde_json::Value;

use renderlet_comfyui::{poll, probe, ComfyUIApi};
use renderlet_core::config::WorkerConfig;
use renderlet_core::job::{validate_job_input, JobResult};
use renderlet_core::{outputs, workflow};
use renderlet_storage::ArtifactStore;

/// Readiness policy: a failed probe is logged but does not gate the
/// job -- submission proceeds regardless. Deliberately preserved from
/// observed production behaviour; see DESIGN.md before changing.
pub const PROCEED_WHEN_UNREADY: bool = true;

/// Run one job from raw input to terminal [`JobResult`].
pub async fn handle_job(
    config: &WorkerConfig,
    api: &ComfyUIApi,
    store: &dyn ArtifactStore,
    input: Option<Value>,
) -> JobResult {
    // ---- Validate ----
    let request = match validate_job_input(input) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected job input");
            return JobResult::error(e.to_string());
        }
    };
    tracing::info!(lora = %request.lora_reference, "Job input validated");

    // ---- Ready check (advisory) ----
    let ready = probe::check_server(api, &config.probe).await;
    if !ready {
        if !PROCEED_WHEN_UNREADY {
            return JobResult::error("Render server is not reachable");
        }
        tracing::warn!("Render server probe failed; proceeding with submission anyway");
    }

    // ---- Mutate workflow ----
    let workflow = match workflow::load_and_mutate(&config.template_path, &request.hyperparameters)
    {
        Ok(workflow) => workflow,
        Err(e) => {
            tracing::error!(error = %e, "Failed to prepare workflow");
            return JobResult::error(e.to_string());
        }
    };

    // ---- Submit ----
    let submitted = match api.submit_workflow(&workflow).await {
        Ok(submitted) => submitted,
        Err(e) => {
            tracing::error!(error = %e, "Failed to queue workflow");
            return JobResult::error(format!("Error queuing workflow: {e}"));
        }
    };
    tracing::info!(
        prompt_id = %submitted.prompt_id,
        queue_position = submitted.number,
        "Workflow queued",
    );

    // ---- Poll for completion ----
    let outputs_map = match poll::await_completion(api, &submitted.prompt_id, &config.poll).await {
        Ok(outputs_map) => outputs_map,
        Err(e) => {
            tracing::error!(prompt_id = %submitted.prompt_id, error = %e, "Polling failed");
            return JobResult::error(e.to_string());
        }
    };

    // ---- Resolve output ----
    let artifact = match outputs::locate_artifact(&config.output_root, &outputs_map) {
        Ok(artifact) => artifact,
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve output artifact");
            return JobResult::error(e.to_string());
        }
    };

    // ---- Publish ----
    match store
        .upload(&artifact.path, &artifact.file_name, &config.hf_repo)
        .await
    {
        Ok(()) => JobResult::success(format!(
            "Successfully uploaded {} to {}",
            artifact.file_name, config.hf_repo
        )),
        Err(e) => {
            tracing::error!(error = %e, file = %artifact.file_name, "Upload failed");
            JobResult::error(format!("Error uploading output: {e}"))
        }
    }
}
