//! Readiness probing for the render server.
//!
//! The render server boots alongside the worker and may not be
//! accepting requests yet when a job arrives. The prober answers one
//! question: did the server respond with a success status within the
//! attempt budget? The caller decides what a `false` answer means.

use renderlet_core::config::AttemptBudget;

use crate::api::ComfyUIApi;

/// Probe the render server until it answers or the budget runs out.
///
/// Performs up to `budget.max_attempts` sequential pings. A 2xx answer
/// returns `true` immediately, with no trailing sleep. Transport
/// failures and non-2xx statuses are logged and retried after
/// `budget.delay` -- they are attempt failures, never raised.
pub async fn check_server(api: &ComfyUIApi, budget: &AttemptBudget) -> bool {
    for attempt in 1..=budget.max_attempts {
        match api.ping().await {
            Ok(()) => {
                tracing::info!(attempt, url = api.api_url(), "Render server is reachable");
                return true;
            }
            Err(e) => {
                tracing::debug!(
                    attempt,
                    max_attempts = budget.max_attempts,
                    error = %e,
                    "Render server not ready yet",
                );
            }
        }

        if attempt < budget.max_attempts {
            tokio::time::sleep(budget.delay).await;
        }
    }

    tracing::warn!(
        url = api.api_url(),
        attempts = budget.max_attempts,
        "Failed to reach render server within the probe budget",
    );
    false
}
