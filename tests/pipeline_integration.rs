//! End-to-end pipeline runs through the public API

use augmentflow::config::AugmentConfig;
use augmentflow::error::ErrorCode;
use augmentflow::hooks::builtin::{default_registry, BuiltinOptions};
use augmentflow::hooks::{HookRegistry, HookStage};
use augmentflow::orchestrator::{CancellationHandle, PipelineOrchestrator, RunRequest};
use augmentflow::services::ImageRef;
use augmentflow::output::{JsonFileSink, MemorySink};
use augmentflow::service::{AugmentRequest, AugmentService};
use augmentflow::session::{ArtifactKind, FailurePoint, FinalStatus, SessionId};
use augmentflow::testing::*;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn config_with_fast_timeouts() -> AugmentConfig {
    AugmentConfig {
        pipeline: fast_settings(),
        ..AugmentConfig::default()
    }
}

fn service_with(options: BuiltinOptions, engine: MockEngine) -> AugmentService {
    let config = config_with_fast_timeouts();
    let registry = default_registry(options).unwrap();
    AugmentService::new(&config, Arc::new(registry), Arc::new(engine))
}

fn options() -> BuiltinOptions {
    BuiltinOptions::from_config(&config_with_fast_timeouts())
}

#[tokio::test]
async fn test_verification_failure_degrades_run() {
    let verifier = MockVerificationService::new(ServiceBehavior::Fail("model offline".into()));
    let service = service_with(
        options().with_verification(Arc::new(verifier.clone())),
        MockEngine::new(),
    );

    let summary = service
        .augment(AugmentRequest::from_prompt(SAMPLE_PROMPT, sample_image()))
        .await
        .unwrap();

    assert_eq!(summary.status, FinalStatus::Degraded);
    assert!(summary.is_success());
    assert_eq!(verifier.call_count(), 1);
    assert!(summary.output_image.is_some());
    assert!(summary
        .warnings
        .iter()
        .any(|w| w.starts_with("Verification skipped:")));
    assert_eq!(summary.skipped_capabilities, vec!["Verification"]);
}

#[tokio::test]
async fn test_slow_verification_times_out_and_degrades() {
    let verifier = MockVerificationService::new(ServiceBehavior::Delay(Duration::from_secs(5)));
    let service = service_with(
        options().with_verification(Arc::new(verifier)),
        MockEngine::new(),
    );

    let summary = service
        .augment(AugmentRequest::from_prompt("motion blur", sample_image()))
        .await
        .unwrap();

    assert_eq!(summary.status, FinalStatus::Degraded);
    assert!(summary
        .artifacts
        .iter()
        .any(|a| a.kind == ArtifactKind::TransformedImage));
}

#[tokio::test]
async fn test_passing_services_complete_run() {
    let service = service_with(
        options()
            .with_verification(Arc::new(MockVerificationService::new(ServiceBehavior::Pass)))
            .with_classification(Arc::new(MockClassificationService::new(
                ServiceBehavior::Pass,
            ))),
        MockEngine::new(),
    );

    let summary = service
        .augment(AugmentRequest::from_prompt(SAMPLE_PROMPT, sample_image()))
        .await
        .unwrap();

    assert_eq!(summary.status, FinalStatus::Completed);
    let kinds: Vec<_> = summary.artifacts.iter().map(|a| a.kind).collect();
    assert!(kinds.contains(&ArtifactKind::OriginalImage));
    assert!(kinds.contains(&ArtifactKind::TransformedImage));
    assert!(kinds.contains(&ArtifactKind::VerificationReport));
    assert!(kinds.contains(&ArtifactKind::ClassificationReport));
    assert!(kinds.contains(&ArtifactKind::Metadata));
}

#[tokio::test]
async fn test_verification_mismatch_is_a_warning() {
    let service = service_with(
        options().with_verification(Arc::new(MockVerificationService::new(
            ServiceBehavior::Mismatch,
        ))),
        MockEngine::new(),
    );

    let summary = service
        .augment(AugmentRequest::from_prompt(SAMPLE_PROMPT, sample_image()))
        .await
        .unwrap();

    assert_eq!(summary.status, FinalStatus::Completed);
    assert!(!summary.warnings.is_empty());
}

#[tokio::test]
async fn test_pre_transform_abort_skips_engine() {
    let engine = MockEngine::new();
    let mut registry = default_registry(options()).unwrap();
    registry
        .register(
            HookStage::PreTransform,
            Arc::new(ScriptedHook::new(
                "policy",
                HookBehavior::Abort("blocked by policy".into()),
            )),
        )
        .unwrap();
    let orchestrator =
        PipelineOrchestrator::new(Arc::new(registry), Arc::new(engine.clone()), fast_settings());

    let report = orchestrator.run(sample_request()).await;

    assert_eq!(report.record.final_status, FinalStatus::Failed);
    assert_eq!(engine.call_count(), 0);
    let failure = report.record.failure.unwrap();
    assert_eq!(failure.point, FailurePoint::Stage(HookStage::PreTransform));
    assert_eq!(failure.hook.as_deref(), Some("policy"));
}

#[tokio::test]
async fn test_engine_failure_surfaces_partial_context() {
    let service = service_with(options(), MockEngine::failing("gpu lost"));

    let summary = service
        .augment(AugmentRequest::from_prompt(SAMPLE_PROMPT, sample_image()))
        .await
        .unwrap();

    assert_eq!(summary.status, FinalStatus::Failed);
    assert!(summary.output_image.is_none());
    let failure = summary.failure.clone().unwrap();
    assert_eq!(failure.point, FailurePoint::TransformEngine);
    assert_eq!(summary.error().unwrap().exit_code(), 4);
    // Intake stages ran before the engine failed
    assert!(summary.metadata.contains_key("intake.width"));
    assert!(summary
        .artifacts
        .iter()
        .any(|a| a.kind == ArtifactKind::OriginalImage));
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let registry = Arc::new(default_registry(options()).unwrap());
    let engine = MockEngine::new();
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        registry,
        Arc::new(engine.clone()),
        fast_settings(),
    ));

    let runs = [
        ("add blur and rotate 15 degrees", "img-a", 640, vec!["Blur", "Rotate"]),
        ("flip vertically", "img-b", 320, vec!["VerticalFlip"]),
        ("grayscale", "img-c", 100, vec!["ToGray"]),
    ];
    let handles: Vec<_> = runs
        .iter()
        .map(|(prompt, image_id, width, _)| {
            let orchestrator = orchestrator.clone();
            let request = RunRequest {
                image: ImageRef::new(*image_id, *width, 200),
                ..run_request(spec_from_prompt(prompt).unwrap())
            };
            tokio::spawn(async move { orchestrator.run(request).await })
        })
        .collect();

    let reports: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(engine.call_count(), 3);
    let ids: HashSet<_> = reports.iter().map(|r| r.record.session_id.clone()).collect();
    assert_eq!(ids.len(), 3);

    for (report, (_, image_id, width, transforms)) in reports.iter().zip(&runs) {
        let ctx = &report.context;
        assert_eq!(report.record.final_status, FinalStatus::Completed);
        assert_eq!(&report.record.transforms, transforms);
        assert_eq!(ctx.metadata_value("intake.image_id"), Some(&json!(image_id)));
        assert_eq!(ctx.metadata_value("intake.width"), Some(&json!(width)));
        assert_eq!(
            ctx.metadata_value("pipeline.transforms"),
            Some(&json!(transforms))
        );
        assert_eq!(
            ctx.working_image().id(),
            format!("{}-mock-{}", image_id, SAMPLE_SEED)
        );
        assert_eq!(
            report
                .record
                .artifacts_of(ArtifactKind::TransformedImage)
                .count(),
            1
        );

        // Nothing from the other runs leaks into this one
        for (_, other_id, _, _) in runs.iter().filter(|run| run.1 != *image_id) {
            assert!(report.record.warnings.iter().all(|w| !w.contains(other_id)));
            assert!(ctx
                .metadata()
                .values()
                .all(|v| !v.to_string().contains(other_id)));
        }
    }
}

#[tokio::test]
async fn test_cancellation_through_service() {
    let mut registry = HookRegistry::new();
    registry
        .register(
            HookStage::PostTransform,
            Arc::new(ScriptedHook::new(
                "slow",
                HookBehavior::Sleep(Duration::from_secs(5)),
            )
            .with_timeout(Duration::from_secs(10))),
        )
        .unwrap();
    let service = AugmentService::new(
        &config_with_fast_timeouts(),
        Arc::new(registry),
        Arc::new(MockEngine::new()),
    );

    let handle = CancellationHandle::new();
    let canceller = handle.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let summary = service
        .augment_with_cancellation(
            AugmentRequest::from_prompt("flip", sample_image()),
            handle.token(),
        )
        .await
        .unwrap();

    assert_eq!(summary.status, FinalStatus::Failed);
    assert_eq!(summary.failure.unwrap().code, ErrorCode::RUN_CANCELLED);
    assert!(summary.output_image.is_some());
}

#[tokio::test]
async fn test_records_reach_sinks() {
    let temp_dir = TempDir::new().unwrap();
    let file_sink = JsonFileSink::new(temp_dir.path());
    let session_id = SessionId::new();

    let service = service_with(options(), MockEngine::new()).with_sink(Arc::new(file_sink.clone()));
    service
        .augment(
            AugmentRequest::from_preset("segmentation", sample_image())
                .with_seed(3)
                .with_session_id(session_id.clone()),
        )
        .await
        .unwrap();

    let stored = file_sink.load(&session_id).await.unwrap().unwrap();
    assert_eq!(stored.seed.value, 3);
    assert_eq!(stored.final_status, FinalStatus::Completed);

    let memory = MemorySink::new();
    let service = service_with(options(), MockEngine::new()).with_sink(Arc::new(memory.clone()));
    service
        .augment(AugmentRequest::from_prompt("grayscale", sample_image()))
        .await
        .unwrap();
    assert_eq!(memory.records().await.len(), 1);
}

#[test]
fn test_register_then_unregister_restores_stage() {
    let mut registry = default_registry(options()).unwrap();
    let before = registry.hook_ids(HookStage::PostTransform);

    registry
        .register(
            HookStage::PostTransform,
            Arc::new(ScriptedHook::continuing("extra")),
        )
        .unwrap();
    assert_eq!(registry.hook_ids(HookStage::PostTransform).len(), before.len() + 1);

    assert!(registry.unregister(HookStage::PostTransform, "extra"));
    assert_eq!(registry.hook_ids(HookStage::PostTransform), before);
}
