//! Run state: the single mutable entity a generation run owns.
//!
//! Exactly one `RunState` is live at a time; starting a new request replaces
//! it wholesale. The orchestrator is the only writer, observers receive
//! cloned snapshots, so no locking is involved.

use uuid::Uuid;

use crate::core::classify::ClassifiedError;
use crate::core::comic::{ArtStyle, Panel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Scripting,
    Drawing,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Scripting => "scripting",
            RunPhase::Drawing => "drawing",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }

    pub fn is_running(self) -> bool {
        matches!(self, RunPhase::Scripting | RunPhase::Drawing)
    }
}

/// Legal phase edges. Script synthesis happens exactly once per run: there is
/// no `Drawing -> Scripting` back-edge. `Failed -> Idle` is the explicit
/// reset; a terminal phase may also move straight to `Scripting` when a new
/// submission replaces the run wholesale. `Scripting/Drawing -> Idle` is the
/// silent credential-reselection recovery.
pub fn can_transition(from: RunPhase, to: RunPhase) -> bool {
    if from == to {
        return true;
    }
    match from {
        RunPhase::Idle => matches!(to, RunPhase::Scripting),
        RunPhase::Scripting => matches!(to, RunPhase::Drawing | RunPhase::Failed | RunPhase::Idle),
        RunPhase::Drawing => {
            matches!(to, RunPhase::Completed | RunPhase::Failed | RunPhase::Idle)
        }
        RunPhase::Completed | RunPhase::Failed => {
            matches!(to, RunPhase::Idle | RunPhase::Scripting)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: String,
    pub phase: RunPhase,
    pub style: Option<ArtStyle>,
    pub panels: Vec<Panel>,
    /// Always equals the number of panels with a set image; monotonically
    /// non-decreasing within a run.
    pub completed_count: usize,
    /// Visible quota countdown, in seconds, while the pipeline waits out a
    /// rate limit. Cleared on the next successful publish.
    pub pending_wait_secs: Option<u64>,
    pub error: Option<ClassifiedError>,
}

impl RunState {
    pub fn idle() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            phase: RunPhase::Idle,
            style: None,
            panels: Vec::new(),
            completed_count: 0,
            pending_wait_secs: None,
            error: None,
        }
    }

    /// Fresh state for a new submission, already in `Scripting`.
    pub fn new_run(style: ArtStyle) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            phase: RunPhase::Scripting,
            style: Some(style),
            panels: Vec::new(),
            completed_count: 0,
            pending_wait_secs: None,
            error: None,
        }
    }

    pub fn panels_with_image(&self) -> usize {
        self.panels.iter().filter(|p| p.image.is_some()).count()
    }

    /// Recompute the derived completion count from the panels themselves.
    pub fn sync_completed_count(&mut self) {
        self.completed_count = self.panels_with_image();
    }

    pub fn fail(&mut self, error: ClassifiedError) {
        self.phase = RunPhase::Failed;
        self.pending_wait_secs = None;
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::ClassifiedError;
    use crate::core::comic::{Panel, PanelImage, PanelScript};
    use bytes::Bytes;

    fn panel(index: usize, with_image: bool) -> Panel {
        let mut panel = Panel::from_script(PanelScript {
            index,
            description: format!("scene {index}"),
            caption: format!("caption {index}"),
        });
        if with_image {
            panel.image = Some(PanelImage {
                mime_type: "image/png".into(),
                data: Bytes::from_static(b"png"),
            });
        }
        panel
    }

    #[test]
    fn transition_table_matches_state_machine() {
        use RunPhase::*;
        assert!(can_transition(Idle, Scripting));
        assert!(can_transition(Scripting, Drawing));
        assert!(can_transition(Scripting, Failed));
        assert!(can_transition(Scripting, Idle));
        assert!(can_transition(Drawing, Completed));
        assert!(can_transition(Drawing, Failed));
        assert!(can_transition(Failed, Idle));
        assert!(can_transition(Completed, Scripting));

        // No back-edge into scripting mid-run, no skipping phases.
        assert!(!can_transition(Drawing, Scripting));
        assert!(!can_transition(Idle, Drawing));
        assert!(!can_transition(Idle, Completed));
        assert!(!can_transition(Completed, Drawing));
        assert!(!can_transition(Failed, Completed));
    }

    #[test]
    fn completed_count_is_derived_from_panels() {
        let mut state = RunState::new_run(crate::core::comic::ArtStyle::Japanese);
        state.panels = vec![panel(1, true), panel(2, true), panel(3, false)];
        state.sync_completed_count();
        assert_eq!(state.completed_count, 2);
        assert!(state.completed_count <= state.panels.len());
    }

    #[test]
    fn fail_clears_countdown_and_keeps_panels() {
        let mut state = RunState::new_run(crate::core::comic::ArtStyle::Pixel);
        state.panels = vec![panel(1, true), panel(2, false)];
        state.sync_completed_count();
        state.pending_wait_secs = Some(30);
        state.fail(ClassifiedError::script_unavailable());

        assert_eq!(state.phase, RunPhase::Failed);
        assert_eq!(state.pending_wait_secs, None);
        assert_eq!(state.completed_count, 1);
        assert!(state.panels[0].image.is_some());
    }
}
