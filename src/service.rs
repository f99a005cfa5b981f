//! Caller-facing entry points
//!
//! [`AugmentService`] ties the pieces together for one process: prompt
//! sanitation, parsing or preset lookup, validation, seed resolution, the
//! orchestrated run and handing the finished record to an output sink.

use crate::config::{AugmentConfig, Limits, PipelineSettings};
use crate::error::{AugmentError, ErrorCode, Result};
use crate::hooks::{HookRegistry, HookStage};
use crate::orchestrator::{
    failure_to_error, CancellationToken, PipelineOrchestrator, RunReport, RunRequest,
};
use crate::output::OutputSink;
use crate::parser;
use crate::parser::rules::PHRASE_RULES;
use crate::presets::{get_preset, Preset, PRESETS};
use crate::seed::{resolve_seed, ResolvedSeed};
use crate::services::{ImageRef, TransformEngine};
use crate::session::{
    Artifact, ArtifactKind, FailureInfo, FinalStatus, SessionId, SessionRecord,
};
use crate::transform::{TransformId, TransformPipelineSpec};
use crate::validation::{PromptGuard, TransformValidator, ValidatedSpec};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// One augmentation request: a prompt or a preset, applied to an image
#[derive(Debug, Clone)]
pub struct AugmentRequest {
    pub prompt: Option<String>,
    pub preset: Option<String>,
    pub image: ImageRef,
    pub seed: Option<u32>,
    pub session_id: Option<SessionId>,
}

impl AugmentRequest {
    pub fn from_prompt(prompt: impl Into<String>, image: ImageRef) -> Self {
        Self {
            prompt: Some(prompt.into()),
            preset: None,
            image,
            seed: None,
            session_id: None,
        }
    }

    pub fn from_preset(preset: impl Into<String>, image: ImageRef) -> Self {
        Self {
            prompt: None,
            preset: Some(preset.into()),
            image,
            seed: None,
            session_id: None,
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// What a caller gets back from [`AugmentService::augment`]
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub status: FinalStatus,
    pub transforms: Vec<String>,
    pub confidence: f64,
    pub seed: ResolvedSeed,
    /// Engine output; absent when the run failed before the engine ran
    pub output_image: Option<ImageRef>,
    pub warnings: Vec<String>,
    pub skipped_capabilities: Vec<String>,
    pub failure: Option<FailureInfo>,
    pub artifacts: Vec<Artifact>,
    pub metadata: BTreeMap<String, Value>,
}

impl SessionSummary {
    pub fn from_report(report: RunReport) -> Self {
        let RunReport { record, context } = report;
        let output_image = record
            .artifacts_of(ArtifactKind::TransformedImage)
            .next()
            .map(|_| context.working_image().clone());
        let SessionRecord {
            session_id,
            final_status,
            transforms,
            seed,
            warnings,
            skipped_capabilities,
            failure,
            artifacts,
            ..
        } = record;

        Self {
            session_id,
            status: final_status,
            transforms,
            confidence: context.pipeline_spec().confidence,
            seed,
            output_image,
            warnings,
            skipped_capabilities,
            failure,
            artifacts,
            metadata: context.metadata().clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The error a failed run stopped with
    pub fn error(&self) -> Option<AugmentError> {
        self.failure.as_ref().map(failure_to_error)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// Phrases that select this transform
    pub phrases: Vec<&'static str>,
}

/// Snapshot of how the service is wired
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub engine: String,
    pub sink: Option<String>,
    pub hooks: BTreeMap<HookStage, Vec<String>>,
    pub default_seed: Option<u32>,
    pub limits: Limits,
    pub timeouts: PipelineSettings,
}

pub struct AugmentService {
    orchestrator: PipelineOrchestrator,
    engine_name: String,
    sink: Option<Arc<dyn OutputSink>>,
    guard: PromptGuard,
    validator: TransformValidator,
    limits: Limits,
    available: Option<Vec<TransformId>>,
    default_seed: RwLock<Option<u32>>,
}

impl AugmentService {
    pub fn new(
        config: &AugmentConfig,
        registry: Arc<HookRegistry>,
        engine: Arc<dyn TransformEngine>,
    ) -> Self {
        let engine_name = engine.name().to_string();
        Self {
            orchestrator: PipelineOrchestrator::new(registry, engine, config.pipeline),
            engine_name,
            sink: None,
            guard: PromptGuard::new(config.limits.max_prompt_length),
            validator: TransformValidator::new(config.limits),
            limits: config.limits,
            available: None,
            default_seed: RwLock::new(config.default_seed),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Restrict parsing to the transforms the engine supports
    pub fn with_available_transforms(mut self, available: Vec<TransformId>) -> Self {
        self.available = Some(available);
        self
    }

    /// Turn a request into a validated pipeline, without running it
    pub fn prepare(&self, request: &AugmentRequest) -> Result<ValidatedSpec> {
        let spec = match (&request.prompt, &request.preset) {
            (Some(prompt), None) => self.compile(prompt)?,
            (None, Some(preset)) => get_preset(preset)?.to_spec(),
            (Some(_), Some(_)) => {
                return Err(AugmentError::validation_with_code(
                    ErrorCode::VALIDATION_MISSING_INPUT,
                    "Give either a prompt or a preset, not both",
                    None,
                ))
            }
            (None, None) => {
                return Err(AugmentError::validation_with_code(
                    ErrorCode::VALIDATION_MISSING_INPUT,
                    "A prompt or a preset is required",
                    None,
                ))
            }
        };
        self.validator.validate(&spec)
    }

    pub async fn augment(&self, request: AugmentRequest) -> Result<SessionSummary> {
        self.augment_with_cancellation(request, CancellationToken::never())
            .await
    }

    /// Run a request; parse and validation errors are returned before any stage runs.
    ///
    /// A run that fails inside the pipeline still yields a summary, with
    /// `status` failed and `failure` set.
    pub async fn augment_with_cancellation(
        &self,
        request: AugmentRequest,
        cancel: CancellationToken,
    ) -> Result<SessionSummary> {
        let spec = self.prepare(&request)?;
        let seed = resolve_seed(request.seed, spec.seed, self.default_seed());
        let run = RunRequest {
            session_id: request.session_id.unwrap_or_default(),
            spec,
            image: request.image,
            seed,
        };

        let report = self.orchestrator.run_with_cancellation(run, cancel).await;
        let mut summary = SessionSummary::from_report(report.clone());

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.store(&report.record).await {
                tracing::warn!(
                    session_id = %report.record.session_id,
                    sink = sink.name(),
                    "Failed to store session record: {}",
                    e
                );
                summary
                    .warnings
                    .push(format!("Session record not stored: {}", e));
            }
        }
        Ok(summary)
    }

    /// Dry run: the validated pipeline a prompt compiles to
    pub fn preview(&self, prompt: &str) -> Result<TransformPipelineSpec> {
        let spec = self.compile(prompt)?;
        Ok(self.validator.validate(&spec)?.into_inner())
    }

    pub fn available_transforms(&self) -> Vec<TransformInfo> {
        TransformId::ALL
            .iter()
            .filter(|id| {
                self.available
                    .as_ref()
                    .map_or(true, |available| available.contains(id))
            })
            .map(|id| TransformInfo {
                name: id.as_str(),
                description: id.description(),
                phrases: PHRASE_RULES
                    .iter()
                    .filter(|rule| rule.transform_id == *id)
                    .map(|rule| rule.phrase)
                    .collect(),
            })
            .collect()
    }

    pub fn presets(&self) -> &'static [Preset] {
        &PRESETS
    }

    pub fn pipeline_status(&self) -> PipelineStatus {
        PipelineStatus {
            engine: self.engine_name.clone(),
            sink: self.sink.as_ref().map(|s| s.name().to_string()),
            hooks: self.orchestrator.registry().list_hooks(),
            default_seed: self.default_seed(),
            limits: self.limits,
            timeouts: *self.orchestrator.settings(),
        }
    }

    /// Seed used when neither the request nor the prompt gives one
    pub fn set_default_seed(&self, seed: Option<u32>) {
        let mut guard = self.default_seed.write().unwrap_or_else(|e| e.into_inner());
        *guard = seed;
        tracing::info!(default_seed = ?seed, "Default seed updated");
    }

    pub fn default_seed(&self) -> Option<u32> {
        *self.default_seed.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Sanitize and parse a prompt; sanitation warnings come first
    fn compile(&self, prompt: &str) -> Result<TransformPipelineSpec> {
        let check = self.guard.check(prompt)?;
        let mut spec = parser::parse(&check.sanitized, self.available.as_deref())?;
        let mut warnings = check.warnings;
        warnings.append(&mut spec.warnings);
        spec.warnings = warnings;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::builtin::{default_registry, BuiltinOptions};
    use crate::output::MemorySink;
    use crate::seed::SeedSource;
    use crate::session::ArtifactKind;
    use crate::testing::{sample_image, MockEngine};
    use async_trait::async_trait;

    fn service() -> AugmentService {
        let config = AugmentConfig::default();
        let registry = default_registry(BuiltinOptions::from_config(&config)).unwrap();
        AugmentService::new(&config, Arc::new(registry), Arc::new(MockEngine::new()))
    }

    struct BrokenSink;

    #[async_trait]
    impl OutputSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        async fn store(&self, _record: &SessionRecord) -> Result<()> {
            Err(AugmentError::other("disk full"))
        }
    }

    #[tokio::test]
    async fn test_augment_prompt_end_to_end() {
        let sink = MemorySink::new();
        let service = service().with_sink(Arc::new(sink.clone()));

        let summary = service
            .augment(
                AugmentRequest::from_prompt("add blur and rotate 15 degrees", sample_image())
                    .with_seed(7),
            )
            .await
            .unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.status, FinalStatus::Completed);
        assert_eq!(summary.transforms, vec!["Blur", "Rotate"]);
        assert_eq!(summary.seed.value, 7);
        assert_eq!(summary.seed.source, SeedSource::Request);
        assert!(summary.output_image.is_some());
        assert_eq!(summary.confidence, 1.0);
        assert!(summary
            .artifacts
            .iter()
            .any(|a| a.kind == ArtifactKind::Metadata));

        let stored = sink.records().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].session_id, summary.session_id);
    }

    #[tokio::test]
    async fn test_augment_preset() {
        let summary = service()
            .augment(AugmentRequest::from_preset("lowlight", sample_image()))
            .await
            .unwrap();
        assert!(summary.is_success());
        assert!(!summary.transforms.is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_returned_before_run() {
        let err = service()
            .augment(AugmentRequest::from_prompt("xyzabc nonsense", sample_image()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PARSE_NO_MATCH);
        assert!(!err.suggestions().is_empty());
    }

    #[tokio::test]
    async fn test_request_needs_exactly_one_input() {
        let service = service();
        let mut request = AugmentRequest::from_prompt("blur", sample_image());
        request.prompt = None;
        assert_eq!(
            service.augment(request.clone()).await.unwrap_err().code(),
            ErrorCode::VALIDATION_MISSING_INPUT
        );

        request.prompt = Some("blur".into());
        request.preset = Some("portrait".into());
        assert!(service.augment(request).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_image_fails_at_intake() {
        let summary = service()
            .augment(AugmentRequest::from_prompt(
                "flip",
                ImageRef::new("huge", 10_000, 100),
            ))
            .await
            .unwrap();

        assert_eq!(summary.status, FinalStatus::Failed);
        assert!(summary.output_image.is_none());
        let error = summary.error().unwrap();
        assert_eq!(error.code(), ErrorCode::STAGE_ABORTED);
        assert!(error.user_message().contains("pre_intake"));
    }

    #[tokio::test]
    async fn test_default_seed_applies() {
        let service = service();
        service.set_default_seed(Some(99));
        let summary = service
            .augment(AugmentRequest::from_prompt("grayscale", sample_image()))
            .await
            .unwrap();
        assert_eq!(summary.seed.value, 99);
        assert_eq!(summary.seed.source, SeedSource::Default);

        let summary = service
            .augment(AugmentRequest::from_prompt("grayscale seed 5", sample_image()))
            .await
            .unwrap();
        assert_eq!(summary.seed.source, SeedSource::Prompt);
    }

    #[tokio::test]
    async fn test_sink_failure_becomes_warning() {
        let summary = service()
            .with_sink(Arc::new(BrokenSink))
            .augment(AugmentRequest::from_prompt("flip", sample_image()))
            .await
            .unwrap();
        assert!(summary.is_success());
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("not stored") && w.contains("disk full")));
    }

    #[test]
    fn test_preview_is_validated() {
        let spec = service().preview("rotate 400 degrees").unwrap();
        assert_eq!(spec.transforms.len(), 1);
        assert_eq!(spec.transforms[0].param_f64("angle"), Some(180.0));
        assert!(spec.warnings.iter().any(|w| w.contains("adjusted")));
    }

    #[test]
    fn test_catalog_listings() {
        let service = service().with_available_transforms(vec![TransformId::Blur]);
        let transforms = service.available_transforms();
        assert_eq!(transforms.len(), 1);
        assert_eq!(transforms[0].name, "Blur");
        assert!(transforms[0].phrases.contains(&"blur"));
        assert!(service.preview("rotate 10 degrees").is_err());
        assert_eq!(service.presets().len(), 3);
    }

    #[test]
    fn test_pipeline_status_lists_builtin_hooks() {
        let status = service().pipeline_status();
        assert_eq!(status.engine, "mock");
        assert_eq!(status.hooks[&HookStage::PreIntake], vec!["intake_guard"]);
        assert_eq!(status.hooks.len(), 8);
        assert_eq!(status.default_seed, None);
    }
}
