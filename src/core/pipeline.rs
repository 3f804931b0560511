//! Panel image pipeline: strictly index-ordered image synthesis with
//! per-panel retries.
//!
//! The retry loop is an explicit state ([`PanelTask`]) advanced by a single
//! [`PanelTask::step`] call, so the policy is testable without waiting on
//! real timers; [`run_pipeline`] is the driver that sleeps between steps and
//! publishes incremental snapshots. Panels run one at a time: the remote
//! service rate-limits per session, and partial visible output beats a
//! faster but opaque batch. Panel *i+1* never starts before panel *i*'s
//! terminal outcome.

use tracing::{info, warn};

use crate::core::classify::{ClassifiedError, classify};
use crate::core::comic::GenerationRequest;
use crate::core::gemini::GenerationClient;
use crate::core::retry::{RetryDecision, RetryPolicy};
use crate::core::run::RunState;

/// Per-panel retry state.
#[derive(Debug, Clone)]
pub struct PanelTask {
    pub index: usize,
    pub attempts: u32,
    pub last_error: Option<ClassifiedError>,
}

#[derive(Debug)]
pub enum StepOutcome {
    /// Image synthesized; the panel is done.
    Done(crate::core::comic::PanelImage),
    /// Attempt failed but the budget allows another try after the wait.
    Backoff(RetryDecision, ClassifiedError),
    /// Fatal error or exhausted budget; the whole pipeline stops here.
    Abort(ClassifiedError),
}

impl PanelTask {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            attempts: 0,
            last_error: None,
        }
    }

    /// Make exactly one synthesis attempt. Never sleeps; the driver owns all
    /// timing.
    pub async fn step(
        &mut self,
        client: &dyn GenerationClient,
        request: &GenerationRequest,
        description: &str,
        policy: &RetryPolicy,
    ) -> StepOutcome {
        self.attempts += 1;
        let error = match client.synthesize_image(request, description).await {
            Ok(image) if image.is_empty() => classify("image synthesis returned zero bytes"),
            Ok(image) => return StepOutcome::Done(image),
            Err(err) => classify(&format!("{err:#}")),
        };
        self.last_error = Some(error.clone());

        if !policy.retryable(error.category) {
            warn!(
                panel = self.index,
                category = error.category.as_str(),
                "panel synthesis failed fatally"
            );
            return StepOutcome::Abort(error);
        }
        if self.attempts >= policy.max_attempts {
            warn!(
                panel = self.index,
                attempts = self.attempts,
                "panel synthesis exhausted its retry budget"
            );
            return StepOutcome::Abort(error);
        }
        match policy.backoff(error.category, self.attempts) {
            Some(decision) => StepOutcome::Backoff(decision, error),
            None => StepOutcome::Abort(error),
        }
    }
}

/// Drive every panel in `state` to an image, in index order. Publishes one
/// snapshot per completed panel (and one per visible quota wait). On abort
/// the error is returned and already-completed panels are left untouched.
pub async fn run_pipeline(
    client: &dyn GenerationClient,
    request: &GenerationRequest,
    policy: &RetryPolicy,
    inter_panel_pause: std::time::Duration,
    state: &mut RunState,
    publish: &mut dyn FnMut(&RunState),
) -> Result<(), ClassifiedError> {
    let total = state.panels.len();
    for i in 0..total {
        let description = state.panels[i].description.clone();
        let mut task = PanelTask::new(state.panels[i].index);
        loop {
            let outcome = task.step(client, request, &description, policy).await;
            state.panels[i].attempts = task.attempts;
            match outcome {
                StepOutcome::Done(image) => {
                    state.panels[i].image = Some(image);
                    state.sync_completed_count();
                    state.pending_wait_secs = None;
                    info!(
                        panel = task.index,
                        attempts = task.attempts,
                        completed = state.completed_count,
                        total,
                        "panel ready"
                    );
                    publish(state);
                    break;
                }
                StepOutcome::Backoff(decision, error) => {
                    warn!(
                        panel = task.index,
                        attempt = task.attempts,
                        wait_secs = decision.wait.as_secs(),
                        "panel attempt failed: {error}"
                    );
                    if decision.show_countdown {
                        state.pending_wait_secs = Some(decision.wait.as_secs());
                        publish(state);
                    }
                    tokio::time::sleep(decision.wait).await;
                }
                StepOutcome::Abort(error) => return Err(error),
            }
        }
        // Unconditional pacing between panels, retried or not, to stay under
        // the service's rate limits.
        if i + 1 < total {
            tokio::time::sleep(inter_panel_pause).await;
        }
    }
    Ok(())
}
