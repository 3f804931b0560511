//! Generation orchestrator: the top-level state machine for one run.
//!
//! `Idle -> Scripting -> Drawing -> {Completed | Failed}`. Script synthesis
//! happens exactly once per run; drawing is delegated to the panel pipeline.
//! Observers subscribe to a watch channel of [`RunState`] snapshots: one
//! writer, any number of passive readers. A rejected credential is resolved,
//! not reported: the orchestrator runs the reselection exchange and returns
//! to `Idle` silently so the caller can resubmit.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::core::classify::{ClassifiedError, ErrorCategory, classify};
use crate::core::comic::{GenerationRequest, Panel};
use crate::core::gemini::GenerationClient;
use crate::core::pipeline::run_pipeline;
use crate::core::retry::RetryPolicy;
use crate::core::run::{RunPhase, RunState, can_transition};

/// Out-of-band credential swap, used only on `CredentialInvalid`. Completes
/// once the user has chosen and confirmed a replacement credential.
#[async_trait]
pub trait CredentialReselector: Send + Sync {
    async fn reselect(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub retry: RetryPolicy,
    /// Unconditional pause between panels, independent of retries.
    pub inter_panel_pause: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            inter_panel_pause: Duration::from_millis(500),
        }
    }
}

pub struct Orchestrator {
    client: Arc<dyn GenerationClient>,
    credentials: Arc<dyn CredentialReselector>,
    config: GenerationConfig,
    tx: watch::Sender<RunState>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        credentials: Arc<dyn CredentialReselector>,
        config: GenerationConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(RunState::idle());
        Self {
            client,
            credentials,
            config,
            tx,
        }
    }

    /// Subscribe to run snapshots. Receivers always see the latest state;
    /// intermediate snapshots may be skipped by slow readers.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> RunState {
        self.tx.borrow().clone()
    }

    /// Discard the current run state and return to `Idle`. Does not interrupt
    /// an in-flight run.
    pub fn reset(&self) {
        self.publish(&RunState::idle());
    }

    /// Drive one request to a terminal snapshot, publishing incremental
    /// progress along the way. Returns the final snapshot. Fails only on
    /// misuse (a run is already in flight).
    pub async fn start(&self, request: GenerationRequest) -> Result<RunState> {
        if self.snapshot().phase.is_running() {
            bail!("a generation run is already in flight");
        }

        let mut state = RunState::new_run(request.style);
        info!(run_id = %state.run_id, style = request.style.as_str(), "starting generation run");
        self.publish(&state);

        let scripts = match self.client.synthesize_script(&request).await {
            Ok(scripts) => scripts,
            Err(err) => {
                let classified = err
                    .downcast_ref::<ClassifiedError>()
                    .cloned()
                    .unwrap_or_else(|| classify(&format!("{err:#}")));
                if classified.category == ErrorCategory::CredentialInvalid {
                    return Ok(self.recover_credentials().await);
                }
                state.fail(classified);
                self.publish(&state);
                return Ok(state);
            }
        };

        if scripts.is_empty() {
            state.fail(ClassifiedError::script_unavailable());
            self.publish(&state);
            return Ok(state);
        }

        state.panels = scripts.into_iter().map(Panel::from_script).collect();
        state.phase = RunPhase::Drawing;
        self.publish(&state);

        let tx = &self.tx;
        let mut publish = |s: &RunState| {
            tx.send_replace(s.clone());
        };
        let result = run_pipeline(
            self.client.as_ref(),
            &request,
            &self.config.retry,
            self.config.inter_panel_pause,
            &mut state,
            &mut publish,
        )
        .await;

        match result {
            Ok(()) => {
                state.phase = RunPhase::Completed;
                info!(run_id = %state.run_id, panels = state.completed_count, "run completed");
                self.publish(&state);
                Ok(state)
            }
            Err(error) if error.category == ErrorCategory::CredentialInvalid => {
                Ok(self.recover_credentials().await)
            }
            Err(error) => {
                warn!(
                    run_id = %state.run_id,
                    category = error.category.as_str(),
                    completed = state.completed_count,
                    "run failed: {error}"
                );
                state.fail(error);
                self.publish(&state);
                Ok(state)
            }
        }
    }

    /// The one failure that is resolved rather than reported: run the
    /// reselection exchange, then return to `Idle` with no error recorded so
    /// the caller can simply resubmit.
    async fn recover_credentials(&self) -> RunState {
        info!("credential rejected by the service, requesting reselection");
        if let Err(err) = self.credentials.reselect().await {
            warn!("credential reselection did not complete: {err:#}");
        }
        let idle = RunState::idle();
        self.publish(&idle);
        idle
    }

    fn publish(&self, state: &RunState) {
        debug_assert!(
            can_transition(self.tx.borrow().phase, state.phase),
            "illegal phase transition {} -> {}",
            self.tx.borrow().phase.as_str(),
            state.phase.as_str()
        );
        self.tx.send_replace(state.clone());
    }
}
