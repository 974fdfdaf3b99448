//! Completion polling against the history endpoint.
//!
//! After submission the server exposes no push channel the worker
//! consumes; completion is detected by re-querying `/history/{id}`
//! until the record exists and carries a non-empty `outputs` map.
//! The record transitions absent -> present exactly once, so the first
//! successful attempt is terminal.

use serde_json::{Map, Value};

use renderlet_core::config::AttemptBudget;

use crate::api::{ComfyUIApi, ComfyUIApiError};

/// Failures while waiting for a submitted job to complete.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The server accepted the job but produced no outputs within the
    /// attempt budget. Distinct from a transport failure: it signals a
    /// likely upstream stall, and is the dominant failure mode for
    /// long-running generation.
    #[error("Exceeded the maximum number of retries ({attempts}) while waiting for outputs")]
    Exhausted { attempts: u32 },

    /// The history query itself failed. Propagated, not retried beyond
    /// the attempt budget.
    #[error(transparent)]
    Api(#[from] ComfyUIApiError),
}

/// Poll the history endpoint until `prompt_id` has outputs.
///
/// One attempt is one query. The loop terminates successfully the
/// first attempt where the record for `prompt_id` exists and its
/// `outputs` map is non-empty, returning that map. Attempts are
/// strictly sequential -- never concurrent -- with `budget.delay`
/// between them.
pub async fn await_completion(
    api: &ComfyUIApi,
    prompt_id: &str,
    budget: &AttemptBudget,
) -> Result<Map<String, Value>, PollError> {
    for attempt in 1..=budget.max_attempts {
        let history = api.get_history(prompt_id).await?;

        if let Some(outputs) = completed_outputs(&history, prompt_id) {
            tracing::info!(prompt_id, attempt, "Render job completed");
            return Ok(outputs.clone());
        }

        tracing::debug!(
            prompt_id,
            attempt,
            max_attempts = budget.max_attempts,
            "Outputs not ready yet",
        );

        if attempt < budget.max_attempts {
            tokio::time::sleep(budget.delay).await;
        }
    }

    Err(PollError::Exhausted {
        attempts: budget.max_attempts,
    })
}

/// Extract the non-empty outputs map for `prompt_id`, if present.
fn completed_outputs<'a>(history: &'a Value, prompt_id: &str) -> Option<&'a Map<String, Value>> {
    history
        .get(prompt_id)?
        .get("outputs")?
        .as_object()
        .filter(|outputs| !outputs.is_empty())
}
