//! The accumulator passed through every stage of a run

use super::record::Artifact;
use super::SessionId;
use crate::hooks::HookStage;
use crate::seed::ResolvedSeed;
use crate::services::ImageRef;
use crate::validation::ValidatedSpec;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Changes a hook asks the orchestrator to make to the context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextPatch {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
}

impl ContextPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty() && self.metadata.is_empty()
    }
}

/// Session state for one run.
///
/// Hooks only ever see `&HookContext`; every change goes through the
/// orchestrator, either as a merged [`ContextPatch`] or as an engine result.
#[derive(Debug, Clone, Serialize)]
pub struct HookContext {
    session_id: SessionId,
    stage: HookStage,
    original_image: ImageRef,
    working_image: ImageRef,
    pipeline_spec: ValidatedSpec,
    seed: ResolvedSeed,
    metadata: BTreeMap<String, Value>,
    warnings: Vec<String>,
    errors: Vec<String>,
    #[serde(skip)]
    timings: BTreeMap<HookStage, Duration>,
    artifacts: Vec<Artifact>,
}

impl HookContext {
    pub fn new(
        session_id: SessionId,
        image: ImageRef,
        pipeline_spec: ValidatedSpec,
        seed: ResolvedSeed,
    ) -> Self {
        let warnings = pipeline_spec.warnings.clone();
        Self {
            session_id,
            stage: HookStage::PreIntake,
            working_image: image.clone(),
            original_image: image,
            pipeline_spec,
            seed,
            metadata: BTreeMap::new(),
            warnings,
            errors: Vec::new(),
            timings: BTreeMap::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn stage(&self) -> HookStage {
        self.stage
    }

    pub fn original_image(&self) -> &ImageRef {
        &self.original_image
    }

    pub fn working_image(&self) -> &ImageRef {
        &self.working_image
    }

    pub fn pipeline_spec(&self) -> &ValidatedSpec {
        &self.pipeline_spec
    }

    pub fn seed(&self) -> ResolvedSeed {
        self.seed
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn timings(&self) -> &BTreeMap<HookStage, Duration> {
        &self.timings
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Merge a hook's patch.
    ///
    /// Warnings and errors are appended. Metadata keys are write-once: a
    /// conflicting value is dropped and reported as a warning naming `hook_id`.
    pub fn apply_patch(&mut self, hook_id: &str, patch: ContextPatch) {
        self.warnings.extend(patch.warnings);
        self.errors.extend(patch.errors);
        for (key, value) in patch.metadata {
            match self.metadata.get(&key) {
                Some(existing) if *existing == value => {}
                Some(_) => self.warnings.push(format!(
                    "Hook '{}' tried to overwrite metadata '{}'; keeping the first value",
                    hook_id, key
                )),
                None => {
                    self.metadata.insert(key, value);
                }
            }
        }
    }

    pub(crate) fn enter_stage(&mut self, stage: HookStage) {
        self.stage = stage;
    }

    pub(crate) fn record_timing(&mut self, stage: HookStage, elapsed: Duration) {
        self.timings.insert(stage, elapsed);
    }

    pub(crate) fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub(crate) fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub(crate) fn add_artifacts(&mut self, stage: HookStage, artifacts: Vec<Artifact>) {
        self.artifacts.extend(artifacts.into_iter().map(|mut artifact| {
            artifact.stage.get_or_insert(stage);
            artifact
        }));
    }

    /// Artifact produced outside any stage, such as the engine output
    pub(crate) fn push_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Install the engine output as the new working image
    pub(crate) fn replace_working_image(&mut self, image: ImageRef) {
        self.working_image = image;
    }

    /// Orchestrator-owned metadata, bypassing the write-once rule
    pub(crate) fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::resolve_seed;
    use crate::transform::{TransformId, TransformPipelineSpec, TransformSpec};
    use crate::validation::TransformValidator;
    use serde_json::json;

    fn context() -> HookContext {
        let spec = TransformPipelineSpec::new("flip", vec![TransformSpec::new(TransformId::VerticalFlip, 0)]);
        let validated = TransformValidator::default().validate(&spec).unwrap();
        HookContext::new(
            SessionId::new(),
            ImageRef::new("img-1", 64, 64),
            validated,
            resolve_seed(Some(1), None, None),
        )
    }

    #[test]
    fn test_patch_appends_in_order() {
        let mut ctx = context();
        ctx.apply_patch("a", ContextPatch::new().warn("first").error("e1"));
        ctx.apply_patch("b", ContextPatch::new().warn("second"));
        assert_eq!(ctx.warnings(), &["first".to_string(), "second".to_string()]);
        assert_eq!(ctx.errors(), &["e1".to_string()]);
    }

    #[test]
    fn test_metadata_first_value_wins() {
        let mut ctx = context();
        ctx.apply_patch("a", ContextPatch::new().insert("k", 1));
        ctx.apply_patch("a", ContextPatch::new().insert("k", 1));
        assert!(ctx.warnings().is_empty());

        ctx.apply_patch("b", ContextPatch::new().insert("k", 2));
        assert_eq!(ctx.metadata_value("k"), Some(&json!(1)));
        assert_eq!(ctx.warnings().len(), 1);
        assert!(ctx.warnings()[0].contains("'b'"));
    }

    #[test]
    fn test_artifacts_are_stamped_with_stage() {
        let mut ctx = context();
        ctx.add_artifacts(
            HookStage::PreSave,
            vec![Artifact::new(
                crate::session::ArtifactKind::Metadata,
                "meta",
                json!({}),
            )],
        );
        assert_eq!(ctx.artifacts()[0].stage, Some(HookStage::PreSave));
    }
}
