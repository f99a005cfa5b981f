//! Stage hooks
//!
//! A run passes through eight fixed [`HookStage`]s. Each stage holds an ordered
//! list of [`Hook`] strategy objects; the orchestrator runs them in
//! registration order and merges their [`HookResult`]s into the session
//! context.

pub mod builtin;
pub mod registry;

pub use registry::{global_registry, install_global, reset_global_registry, HookRegistry};

use crate::session::{Artifact, ContextPatch, HookContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The fixed stage slots, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
    PreIntake,
    PostIntake,
    PreTransform,
    PostTransform,
    PostTransformVerify,
    PostTransformClassify,
    PreSave,
    PostSave,
}

impl HookStage {
    pub const ALL: [HookStage; 8] = [
        HookStage::PreIntake,
        HookStage::PostIntake,
        HookStage::PreTransform,
        HookStage::PostTransform,
        HookStage::PostTransformVerify,
        HookStage::PostTransformClassify,
        HookStage::PreSave,
        HookStage::PostSave,
    ];

    /// Position in the run, 0-based
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Optional stages degrade the run on failure instead of failing it
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            HookStage::PostTransformVerify | HookStage::PostTransformClassify
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::PreIntake => "pre_intake",
            HookStage::PostIntake => "post_intake",
            HookStage::PreTransform => "pre_transform",
            HookStage::PostTransform => "post_transform",
            HookStage::PostTransformVerify => "post_transform_verify",
            HookStage::PostTransformClassify => "post_transform_classify",
            HookStage::PreSave => "pre_save",
            HookStage::PostSave => "post_save",
        }
    }

    /// Capability lost when this optional stage is skipped
    pub fn capability(&self) -> Option<&'static str> {
        match self {
            HookStage::PostTransformVerify => Some("Verification"),
            HookStage::PostTransformClassify => Some("Classification"),
            _ => None,
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the orchestrator should do after a hook returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Continue,
    /// End the current stage; remaining hooks in it are not run
    Skip,
    /// Stop the stage as failed
    Abort,
}

/// The result of executing a hook.
#[derive(Debug, Clone, PartialEq)]
pub struct HookResult {
    pub outcome: StageOutcome,
    pub patch: ContextPatch,
    pub artifacts: Vec<Artifact>,
    /// Reason given with `Skip` or `Abort`
    pub reason: Option<String>,
}

impl HookResult {
    pub fn proceed() -> Self {
        Self {
            outcome: StageOutcome::Continue,
            patch: ContextPatch::default(),
            artifacts: Vec::new(),
            reason: None,
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            outcome: StageOutcome::Skip,
            reason: Some(reason.into()),
            ..Self::proceed()
        }
    }

    pub fn abort(reason: impl Into<String>) -> Self {
        Self {
            outcome: StageOutcome::Abort,
            reason: Some(reason.into()),
            ..Self::proceed()
        }
    }

    pub fn with_patch(mut self, patch: ContextPatch) -> Self {
        self.patch = patch;
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }
}

/// Hook execution errors.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Hook execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error("Hook timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Service call failed: {reason}")]
    Service { reason: String },
}

impl HookError {
    pub fn failed(reason: impl Into<String>) -> Self {
        HookError::ExecutionFailed {
            reason: reason.into(),
        }
    }
}

/// A strategy object attached to one or more stages.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Unique id within a stage; re-registering the same id replaces the hook.
    fn id(&self) -> &str;

    /// Own time limit; when `None` the orchestrator's hook timeout applies.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn run(&self, ctx: &HookContext) -> Result<HookResult, HookError>;
}
