//! Pure run-state transitions (no I/O, no side effects)

use crate::hooks::HookStage;
use crate::session::{FinalStatus, StageStatus};

/// Where a run is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    RunningStage { stage: HookStage, degraded: bool },
    Completed,
    Degraded,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Degraded | RunState::Failed
        )
    }

    /// Stage currently executing, if any
    pub fn current_stage(&self) -> Option<HookStage> {
        match self {
            RunState::RunningStage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Leave `Init` for the first stage
    pub fn start(self) -> RunState {
        match self {
            RunState::Init => RunState::RunningStage {
                stage: HookStage::PreIntake,
                degraded: false,
            },
            other => other,
        }
    }

    /// Transition after the current stage ended with `status`
    pub fn advance(self, status: StageStatus) -> RunState {
        let RunState::RunningStage { stage, degraded } = self else {
            return self;
        };
        if status == StageStatus::Failed {
            return RunState::Failed;
        }
        let degraded = degraded || status == StageStatus::Degraded;
        match next_stage(stage) {
            Some(next) => RunState::RunningStage {
                stage: next,
                degraded,
            },
            None if degraded => RunState::Degraded,
            None => RunState::Completed,
        }
    }

    /// Abort from any non-terminal state
    pub fn fail(self) -> RunState {
        match self {
            RunState::Completed | RunState::Degraded => self,
            _ => RunState::Failed,
        }
    }

    pub fn final_status(&self) -> Option<FinalStatus> {
        match self {
            RunState::Completed => Some(FinalStatus::Completed),
            RunState::Degraded => Some(FinalStatus::Degraded),
            RunState::Failed => Some(FinalStatus::Failed),
            _ => None,
        }
    }
}

pub fn next_stage(stage: HookStage) -> Option<HookStage> {
    HookStage::ALL.get(stage.index() + 1).copied()
}

/// Warning recorded when an optional stage is skipped because it failed
pub fn skipped_notice(stage: HookStage, reason: &str) -> String {
    let capability = stage.capability().unwrap_or(stage.as_str());
    format!("{} skipped: {}", capability, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_through(statuses: &[StageStatus]) -> RunState {
        statuses
            .iter()
            .fold(RunState::Init.start(), |state, status| state.advance(*status))
    }

    #[test]
    fn test_clean_run_completes() {
        let state = run_through(&[StageStatus::Completed; 8]);
        assert_eq!(state, RunState::Completed);
        assert_eq!(state.final_status(), Some(FinalStatus::Completed));
    }

    #[test]
    fn test_degraded_stage_marks_run_degraded() {
        let mut statuses = [StageStatus::Completed; 8];
        statuses[HookStage::PostTransformVerify.index()] = StageStatus::Degraded;
        assert_eq!(run_through(&statuses), RunState::Degraded);
    }

    #[test]
    fn test_failure_is_terminal() {
        let state = run_through(&[StageStatus::Completed, StageStatus::Failed]);
        assert_eq!(state, RunState::Failed);
        assert_eq!(state.advance(StageStatus::Completed), RunState::Failed);
    }

    #[test]
    fn test_skipped_stage_continues() {
        let state = RunState::Init.start().advance(StageStatus::Skipped);
        assert_eq!(state.current_stage(), Some(HookStage::PostIntake));
    }

    #[test]
    fn test_skipped_notice() {
        assert_eq!(
            skipped_notice(HookStage::PostTransformVerify, "timed out"),
            "Verification skipped: timed out"
        );
        assert_eq!(
            skipped_notice(HookStage::PostTransformClassify, "x"),
            "Classification skipped: x"
        );
    }
}
