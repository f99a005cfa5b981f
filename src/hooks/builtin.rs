//! Default hook set, one or more per stage

use super::{Hook, HookError, HookRegistry, HookResult, HookStage};
use crate::config::AugmentConfig;
use crate::error::Result;
use crate::services::{ClassificationService, VerificationService};
use crate::session::{Artifact, ArtifactKind, ContextPatch, HookContext};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Rejects images larger than the configured maximum dimension
pub struct IntakeGuard {
    max_dimension: u32,
}

impl IntakeGuard {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

#[async_trait]
impl Hook for IntakeGuard {
    fn id(&self) -> &str {
        "intake_guard"
    }

    async fn run(&self, ctx: &HookContext) -> std::result::Result<HookResult, HookError> {
        let image = ctx.original_image();
        let patch = ContextPatch::new()
            .insert("intake.image_id", image.id())
            .insert("intake.width", image.width())
            .insert("intake.height", image.height());

        if image.width() == 0 || image.height() == 0 {
            return Ok(HookResult::abort(format!(
                "Image {} has zero size ({}x{})",
                image.id(),
                image.width(),
                image.height()
            ))
            .with_patch(patch));
        }
        if image.max_dimension() > self.max_dimension {
            return Ok(HookResult::abort(format!(
                "Image too large: {}x{} (max: {}x{})",
                image.width(),
                image.height(),
                self.max_dimension,
                self.max_dimension
            ))
            .with_patch(patch));
        }
        Ok(HookResult::proceed().with_patch(patch))
    }
}

/// Records what was parsed and registers the original image
pub struct IntakeSummary;

#[async_trait]
impl Hook for IntakeSummary {
    fn id(&self) -> &str {
        "intake_summary"
    }

    async fn run(&self, ctx: &HookContext) -> std::result::Result<HookResult, HookError> {
        let spec = ctx.pipeline_spec();
        let image = ctx.original_image();
        Ok(HookResult::proceed()
            .with_patch(
                ContextPatch::new()
                    .insert("pipeline.transforms", json!(spec.transform_names()))
                    .insert("pipeline.count", spec.transforms.len())
                    .insert("pipeline.confidence", spec.confidence),
            )
            .with_artifact(Artifact::new(
                ArtifactKind::OriginalImage,
                "original",
                json!({ "id": image.id(), "width": image.width(), "height": image.height() }),
            )))
    }
}

/// Last check before the engine runs
pub struct SpecGuard;

#[async_trait]
impl Hook for SpecGuard {
    fn id(&self) -> &str {
        "spec_guard"
    }

    async fn run(&self, ctx: &HookContext) -> std::result::Result<HookResult, HookError> {
        if ctx.pipeline_spec().is_empty() {
            return Ok(HookResult::abort("Pipeline has no transforms"));
        }
        let seed = ctx.seed();
        let mut patch = ContextPatch::new();
        for (key, value) in seed.metadata() {
            patch = patch.insert(key, value);
        }
        Ok(HookResult::proceed().with_patch(patch))
    }
}

/// Records the engine's effect on the image
pub struct TransformSummary;

#[async_trait]
impl Hook for TransformSummary {
    fn id(&self) -> &str {
        "transform_summary"
    }

    async fn run(&self, ctx: &HookContext) -> std::result::Result<HookResult, HookError> {
        let output = ctx.working_image();
        Ok(HookResult::proceed().with_patch(
            ContextPatch::new()
                .insert("output.width", output.width())
                .insert("output.height", output.height())
                .insert("output.changed", output != ctx.original_image()),
        ))
    }
}

/// Asks the verification service whether the result matches the prompt
pub struct VerificationHook {
    service: Option<Arc<dyn VerificationService>>,
    timeout: Duration,
}

impl VerificationHook {
    pub fn new(service: Option<Arc<dyn VerificationService>>, timeout: Duration) -> Self {
        Self { service, timeout }
    }
}

#[async_trait]
impl Hook for VerificationHook {
    fn id(&self) -> &str {
        "verification"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn run(&self, ctx: &HookContext) -> std::result::Result<HookResult, HookError> {
        let Some(service) = &self.service else {
            return Ok(HookResult::skip("no verification service configured"));
        };

        let report = service
            .compare(ctx.original_image(), ctx.working_image(), ctx.pipeline_spec())
            .await
            .map_err(|e| HookError::Service {
                reason: e.to_string(),
            })?;

        let mut patch = ContextPatch::new()
            .insert("verification.matches_intent", report.matches_intent)
            .insert("verification.confidence", report.confidence);
        if !report.matches_intent {
            patch = patch.warn(format!(
                "Verification: result may not match the prompt (confidence {:.2})",
                report.confidence
            ));
        }
        let payload = serde_json::to_value(&report).map_err(|e| HookError::failed(e.to_string()))?;
        Ok(HookResult::proceed()
            .with_patch(patch)
            .with_artifact(Artifact::new(
                ArtifactKind::VerificationReport,
                "verification",
                payload,
            )))
    }
}

/// Asks the classification service whether the image kept its class
pub struct ClassificationHook {
    service: Option<Arc<dyn ClassificationService>>,
    timeout: Duration,
}

impl ClassificationHook {
    pub fn new(service: Option<Arc<dyn ClassificationService>>, timeout: Duration) -> Self {
        Self { service, timeout }
    }
}

#[async_trait]
impl Hook for ClassificationHook {
    fn id(&self) -> &str {
        "classification"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn run(&self, ctx: &HookContext) -> std::result::Result<HookResult, HookError> {
        let Some(service) = &self.service else {
            return Ok(HookResult::skip("no classification service configured"));
        };

        let report = service
            .classify_consistency(ctx.original_image(), ctx.working_image())
            .await
            .map_err(|e| HookError::Service {
                reason: e.to_string(),
            })?;

        let mut patch = ContextPatch::new()
            .insert("classification.consistent", report.consistent)
            .insert("classification.original", report.original_label.clone())
            .insert("classification.transformed", report.transformed_label.clone());
        if !report.consistent {
            patch = patch.warn(format!(
                "Classification changed from '{}' to '{}'",
                report.original_label, report.transformed_label
            ));
        }
        let payload = serde_json::to_value(&report).map_err(|e| HookError::failed(e.to_string()))?;
        Ok(HookResult::proceed()
            .with_patch(patch)
            .with_artifact(Artifact::new(
                ArtifactKind::ClassificationReport,
                "classification",
                payload,
            )))
    }
}

/// Registers the metadata artifact describing everything the run produced
pub struct ArtifactManifest;

#[async_trait]
impl Hook for ArtifactManifest {
    fn id(&self) -> &str {
        "artifact_manifest"
    }

    async fn run(&self, ctx: &HookContext) -> std::result::Result<HookResult, HookError> {
        let produced: Vec<&str> = ctx.artifacts().iter().map(|a| a.name.as_str()).collect();
        let image = ctx.working_image();
        Ok(HookResult::proceed().with_artifact(Artifact::new(
            ArtifactKind::Metadata,
            "manifest",
            json!({
                "session_id": ctx.session_id().as_str(),
                "transformed": { "id": image.id(), "width": image.width(), "height": image.height() },
                "artifacts": produced,
                "metadata": ctx.metadata(),
            }),
        )))
    }
}

/// Final counts for the session
pub struct SessionSummaryHook;

#[async_trait]
impl Hook for SessionSummaryHook {
    fn id(&self) -> &str {
        "session_summary"
    }

    async fn run(&self, ctx: &HookContext) -> std::result::Result<HookResult, HookError> {
        let timings: serde_json::Map<String, serde_json::Value> = ctx
            .timings()
            .iter()
            .map(|(stage, elapsed)| (stage.to_string(), json!(elapsed.as_millis() as u64)))
            .collect();
        Ok(HookResult::proceed().with_patch(
            ContextPatch::new()
                .insert("summary.warnings", ctx.warnings().len())
                .insert("summary.artifacts", ctx.artifacts().len())
                .insert("summary.stage_timings_ms", serde_json::Value::Object(timings)),
        ))
    }
}

/// Options for building the default registry
#[derive(Clone)]
pub struct BuiltinOptions {
    pub max_image_dimension: u32,
    pub service_timeout: Duration,
    pub verification: Option<Arc<dyn VerificationService>>,
    pub classification: Option<Arc<dyn ClassificationService>>,
}

impl Default for BuiltinOptions {
    fn default() -> Self {
        Self::from_config(&AugmentConfig::default())
    }
}

impl BuiltinOptions {
    pub fn from_config(config: &AugmentConfig) -> Self {
        Self {
            max_image_dimension: config.limits.max_image_dimension,
            service_timeout: config.pipeline.optional_stage_timeout,
            verification: None,
            classification: None,
        }
    }

    pub fn with_verification(mut self, service: Arc<dyn VerificationService>) -> Self {
        self.verification = Some(service);
        self
    }

    pub fn with_classification(mut self, service: Arc<dyn ClassificationService>) -> Self {
        self.classification = Some(service);
        self
    }
}

/// Registry with the built-in hook for every stage
pub fn default_registry(options: BuiltinOptions) -> Result<HookRegistry> {
    let mut registry = HookRegistry::new();
    registry.register(
        HookStage::PreIntake,
        Arc::new(IntakeGuard::new(options.max_image_dimension)),
    )?;
    registry.register(HookStage::PostIntake, Arc::new(IntakeSummary))?;
    registry.register(HookStage::PreTransform, Arc::new(SpecGuard))?;
    registry.register(HookStage::PostTransform, Arc::new(TransformSummary))?;
    registry.register(
        HookStage::PostTransformVerify,
        Arc::new(VerificationHook::new(
            options.verification,
            options.service_timeout,
        )),
    )?;
    registry.register(
        HookStage::PostTransformClassify,
        Arc::new(ClassificationHook::new(
            options.classification,
            options.service_timeout,
        )),
    )?;
    registry.register(HookStage::PreSave, Arc::new(ArtifactManifest))?;
    registry.register(HookStage::PostSave, Arc::new(SessionSummaryHook))?;
    Ok(registry)
}
