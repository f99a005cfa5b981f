//! Finalized session records and the artifacts they carry

use super::SessionId;
use crate::hooks::HookStage;
use crate::seed::ResolvedSeed;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    OriginalImage,
    TransformedImage,
    Metadata,
    VerificationReport,
    ClassificationReport,
    Other,
}

/// Something a stage produced that storage may want to keep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub name: String,
    /// Stage that produced it; stamped by the orchestrator
    pub stage: Option<HookStage>,
    pub payload: serde_json::Value,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind,
            name: name.into(),
            stage: None,
            payload,
        }
    }
}

/// How a single stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    /// A hook returned `Skip`; later hooks in the stage did not run
    Skipped,
    /// Optional stage failed; the run continued
    Degraded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    pub stage: HookStage,
    pub status: StageStatus,
    pub hooks_run: usize,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Completed,
    Degraded,
    Failed,
}

impl FinalStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, FinalStatus::Failed)
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FinalStatus::Completed => "completed",
            FinalStatus::Degraded => "degraded",
            FinalStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Where a failed run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "at", content = "stage")]
pub enum FailurePoint {
    Stage(HookStage),
    TransformEngine,
}

impl fmt::Display for FailurePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePoint::Stage(stage) => write!(f, "{}", stage),
            FailurePoint::TransformEngine => f.write_str("transform_engine"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub point: FailurePoint,
    pub hook: Option<String>,
    pub code: u16,
    pub message: String,
}

/// The finalized result of one orchestrator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stage_history: Vec<StageEntry>,
    pub final_status: FinalStatus,
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub skipped_capabilities: Vec<String>,
    pub failure: Option<FailureInfo>,
    pub seed: ResolvedSeed,
    pub transforms: Vec<String>,
}

impl SessionRecord {
    pub fn stage_status(&self, stage: HookStage) -> Option<StageStatus> {
        self.stage_history
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.status)
    }

    pub fn artifacts_of(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(move |a| a.kind == kind)
    }
}
