//! Staged pipeline orchestrator
//!
//! Drives one session through the eight fixed hook stages, calling the
//! transform engine exactly once between `PreTransform` and `PostTransform`.
//! Every external call (hook or engine) runs under its own timeout, the
//! run-wide deadline and the session's cancellation token. Mandatory stage
//! failures stop the run; optional stage failures degrade it.

pub mod cancel;
pub mod state;


pub use cancel::{CancellationHandle, CancellationToken};
pub use state::RunState;

use crate::config::PipelineSettings;
use crate::error::{AugmentError, ErrorCode};
use crate::hooks::{HookError, HookRegistry, HookStage, StageOutcome};
use crate::seed::ResolvedSeed;
use crate::services::{ImageRef, TransformEngine};
use crate::session::{
    Artifact, ArtifactKind, FailureInfo, FailurePoint, HookContext, SessionId, SessionRecord,
    StageEntry, StageStatus,
};
use crate::validation::ValidatedSpec;
use chrono::Utc;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Everything one run needs
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub session_id: SessionId,
    pub spec: ValidatedSpec,
    pub image: ImageRef,
    pub seed: ResolvedSeed,
}

/// Finalized record plus the context as it stood when the run ended
#[derive(Debug, Clone)]
pub struct RunReport {
    pub record: SessionRecord,
    pub context: HookContext,
}

impl RunReport {
    /// The error a failed run stopped with
    pub fn error(&self) -> Option<AugmentError> {
        self.record.failure.as_ref().map(failure_to_error)
    }
}

/// Why a guarded call did not produce a value
#[derive(Debug)]
enum CallError<E> {
    Failed(E),
    TimedOut(Duration),
    Panicked(String),
    Interrupted(Interrupt),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Deadline,
    Cancelled,
}

/// How a stage ended, before it is folded into the run state
struct StageReport {
    status: StageStatus,
    hooks_run: usize,
    failure: Option<FailureInfo>,
    interrupt: Option<Interrupt>,
}

pub struct PipelineOrchestrator {
    registry: Arc<HookRegistry>,
    engine: Arc<dyn TransformEngine>,
    settings: PipelineSettings,
}

impl PipelineOrchestrator {
    pub fn new(
        registry: Arc<HookRegistry>,
        engine: Arc<dyn TransformEngine>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            engine,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn run(&self, request: RunRequest) -> RunReport {
        self.run_with_cancellation(request, CancellationToken::never())
            .await
    }

    pub async fn run_with_cancellation(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
    ) -> RunReport {
        let span = tracing::info_span!("session", session_id = %request.session_id);
        self.execute(request, cancel).instrument(span).await
    }

    async fn execute(&self, request: RunRequest, mut cancel: CancellationToken) -> RunReport {
        let created_at = Utc::now();
        let started = Instant::now();
        let deadline = started + self.settings.run_timeout;
        let RunRequest {
            session_id,
            spec,
            image,
            seed,
        } = request;

        tracing::info!(
            transforms = spec.transforms.len(),
            seed = seed.value,
            "Starting pipeline run"
        );

        let mut ctx = HookContext::new(session_id.clone(), image, spec, seed);
        let mut state = RunState::Init.start();
        let mut history = Vec::new();
        let mut skipped_capabilities = Vec::new();
        let mut failure = None;

        while let Some(stage) = state.current_stage() {
            ctx.enter_stage(stage);
            let stage_started = Instant::now();
            let report = self.run_stage(stage, &mut ctx, deadline, &mut cancel).await;

            let mut status = report.status;
            let mut stage_failure = report.failure;

            if stage == HookStage::PreTransform && status != StageStatus::Failed {
                if let Err(engine_failure) =
                    self.apply_engine(&mut ctx, deadline, &mut cancel).await
                {
                    status = StageStatus::Failed;
                    stage_failure = Some(engine_failure);
                }
            }

            let elapsed = stage_started.elapsed();
            ctx.record_timing(stage, elapsed);
            history.push(StageEntry {
                stage,
                status,
                hooks_run: report.hooks_run,
                duration: elapsed,
            });

            if status == StageStatus::Degraded {
                if let Some(capability) = stage.capability() {
                    skipped_capabilities.push(capability.to_string());
                }
            }
            if let Some(info) = stage_failure {
                tracing::error!(
                    stage = %stage,
                    point = %info.point,
                    code = info.code,
                    "Pipeline run failed: {}",
                    info.message
                );
                ctx.push_error(format!("{}: {}", info.point, info.message));
                failure = Some(info);
            }
            if report.interrupt.is_some() {
                state = state.fail();
                break;
            }
            state = state.advance(status);
        }

        let final_status = state
            .final_status()
            .unwrap_or(crate::session::FinalStatus::Failed);
        tracing::info!(
            status = %final_status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            warnings = ctx.warnings().len(),
            "Pipeline run finished"
        );

        let record = SessionRecord {
            session_id,
            created_at,
            finished_at: Utc::now(),
            stage_history: history,
            final_status,
            artifacts: ctx.artifacts().to_vec(),
            warnings: ctx.warnings().to_vec(),
            errors: ctx.errors().to_vec(),
            skipped_capabilities,
            failure,
            seed: ctx.seed(),
            transforms: ctx
                .pipeline_spec()
                .transform_names()
                .into_iter()
                .map(String::from)
                .collect(),
        };
        RunReport {
            record,
            context: ctx,
        }
    }

    async fn run_stage(
        &self,
        stage: HookStage,
        ctx: &mut HookContext,
        deadline: Instant,
        cancel: &mut CancellationToken,
    ) -> StageReport {
        let mut hooks_run = 0;
        for hook in self.registry.hooks_for(stage) {
            hooks_run += 1;
            let limit = hook.timeout().unwrap_or(self.settings.hook_timeout);
            tracing::debug!(stage = %stage, hook = hook.id(), "Running hook");

            let outcome = guarded(hook.run(ctx), limit, deadline, cancel).await;
            let (code, message) = match outcome {
                Ok(result) => {
                    let reason = result.reason;
                    ctx.apply_patch(hook.id(), result.patch);
                    ctx.add_artifacts(stage, result.artifacts);
                    match result.outcome {
                        StageOutcome::Continue => continue,
                        StageOutcome::Skip => {
                            tracing::debug!(
                                stage = %stage,
                                hook = hook.id(),
                                reason = reason.as_deref().unwrap_or(""),
                                "Hook skipped rest of stage"
                            );
                            return StageReport {
                                status: StageStatus::Skipped,
                                hooks_run,
                                failure: None,
                                interrupt: None,
                            };
                        }
                        StageOutcome::Abort => (
                            ErrorCode::STAGE_ABORTED,
                            format!(
                                "hook '{}' aborted: {}",
                                hook.id(),
                                reason.unwrap_or_else(|| "no reason given".to_string())
                            ),
                        ),
                    }
                }
                Err(CallError::Failed(HookError::Timeout { timeout: limit }))
                | Err(CallError::TimedOut(limit)) => (
                    ErrorCode::STAGE_HOOK_TIMEOUT,
                    format!(
                        "hook '{}' timed out after {}",
                        hook.id(),
                        humantime_serde::re::humantime::format_duration(limit)
                    ),
                ),
                Err(CallError::Failed(e)) => (
                    ErrorCode::STAGE_HOOK_FAILED,
                    format!("hook '{}' failed: {}", hook.id(), e),
                ),
                Err(CallError::Panicked(msg)) => (
                    ErrorCode::STAGE_HOOK_PANICKED,
                    format!("hook '{}' panicked: {}", hook.id(), msg),
                ),
                Err(CallError::Interrupted(interrupt)) => {
                    return StageReport {
                        status: StageStatus::Failed,
                        hooks_run,
                        failure: Some(self.interrupt_failure(
                            interrupt,
                            FailurePoint::Stage(stage),
                            Some(hook.id().to_string()),
                        )),
                        interrupt: Some(interrupt),
                    };
                }
            };

            if stage.is_optional() {
                let code = optional_code(code);
                let notice = state::skipped_notice(stage, &message);
                tracing::warn!(stage = %stage, hook = hook.id(), code, "{}", notice);
                ctx.push_warning(notice);
                return StageReport {
                    status: StageStatus::Degraded,
                    hooks_run,
                    failure: None,
                    interrupt: None,
                };
            }

            return StageReport {
                status: StageStatus::Failed,
                hooks_run,
                failure: Some(FailureInfo {
                    point: FailurePoint::Stage(stage),
                    hook: Some(hook.id().to_string()),
                    code,
                    message,
                }),
                interrupt: None,
            };
        }

        StageReport {
            status: StageStatus::Completed,
            hooks_run,
            failure: None,
            interrupt: None,
        }
    }

    /// Call the engine once; on success its output becomes the working image
    async fn apply_engine(
        &self,
        ctx: &mut HookContext,
        deadline: Instant,
        cancel: &mut CancellationToken,
    ) -> Result<(), FailureInfo> {
        let seed = ctx.seed().value;
        tracing::debug!(engine = self.engine.name(), seed, "Applying transforms");

        let outcome = guarded(
            self.engine
                .apply(ctx.working_image(), ctx.pipeline_spec(), seed),
            self.settings.engine_timeout,
            deadline,
            cancel,
        )
        .await;

        let (code, message) = match outcome {
            Ok(output) => {
                for (key, value) in output.metadata {
                    ctx.set_metadata(format!("engine.{}", key), value);
                }
                ctx.push_artifact(Artifact::new(
                    ArtifactKind::TransformedImage,
                    "transformed",
                    json!({
                        "id": output.image.id(),
                        "width": output.image.width(),
                        "height": output.image.height(),
                    }),
                ));
                ctx.replace_working_image(output.image);
                return Ok(());
            }
            Err(CallError::Failed(e)) => (e.code(), e.to_string()),
            Err(CallError::TimedOut(limit)) => (
                ErrorCode::TRANSFORM_ENGINE_TIMEOUT,
                format!(
                    "engine timed out after {}",
                    humantime_serde::re::humantime::format_duration(limit)
                ),
            ),
            Err(CallError::Panicked(msg)) => (
                ErrorCode::TRANSFORM_ENGINE_FAILED,
                format!("engine panicked: {}", msg),
            ),
            Err(CallError::Interrupted(interrupt)) => {
                return Err(self.interrupt_failure(
                    interrupt,
                    FailurePoint::TransformEngine,
                    None,
                ));
            }
        };

        Err(FailureInfo {
            point: FailurePoint::TransformEngine,
            hook: None,
            code,
            message,
        })
    }

    fn interrupt_failure(
        &self,
        interrupt: Interrupt,
        point: FailurePoint,
        hook: Option<String>,
    ) -> FailureInfo {
        let (code, message) = match interrupt {
            Interrupt::Deadline => (
                ErrorCode::TIMEOUT_RUN_DEADLINE,
                format!(
                    "run exceeded its deadline of {}",
                    humantime_serde::re::humantime::format_duration(self.settings.run_timeout)
                ),
            ),
            Interrupt::Cancelled => (ErrorCode::RUN_CANCELLED, "run was cancelled".to_string()),
        };
        FailureInfo {
            point,
            hook,
            code,
            message,
        }
    }
}

/// Await `call` under its own time limit, the run deadline and cancellation.
/// Panics inside the call are caught and reported.
async fn guarded<F, T, E>(
    call: F,
    limit: Duration,
    deadline: Instant,
    cancel: &mut CancellationToken,
) -> Result<T, CallError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    let call = AssertUnwindSafe(call).catch_unwind();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CallError::Interrupted(Interrupt::Cancelled)),
        _ = tokio::time::sleep_until(deadline) => Err(CallError::Interrupted(Interrupt::Deadline)),
        result = tokio::time::timeout(limit, call) => match result {
            Err(_) => Err(CallError::TimedOut(limit)),
            Ok(Err(panic)) => Err(CallError::Panicked(panic_message(panic))),
            Ok(Ok(Err(e))) => Err(CallError::Failed(e)),
            Ok(Ok(Ok(value))) => Ok(value),
        },
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Optional-stage counterpart of a mandatory stage error code
fn optional_code(code: u16) -> u16 {
    match code {
        ErrorCode::STAGE_HOOK_TIMEOUT => ErrorCode::OPTIONAL_STAGE_TIMEOUT,
        ErrorCode::STAGE_ABORTED => ErrorCode::OPTIONAL_STAGE_ABORTED,
        _ => ErrorCode::OPTIONAL_SERVICE_FAILED,
    }
}

/// Rebuild the typed error a failed run stopped with
pub fn failure_to_error(info: &FailureInfo) -> AugmentError {
    match info.code {
        ErrorCode::TIMEOUT_RUN_DEADLINE => {
            AugmentError::pipeline_timeout(info.message.clone(), None).with_context(info.point)
        }
        ErrorCode::RUN_CANCELLED => {
            AugmentError::cancelled(info.message.clone(), None).with_context(info.point)
        }
        code if info.point == FailurePoint::TransformEngine => {
            AugmentError::transform_execution_with_code(code, info.message.clone())
        }
        code => {
            let stage = match info.point {
                FailurePoint::Stage(stage) => Some(stage.to_string()),
                FailurePoint::TransformEngine => None,
            };
            AugmentError::stage(code, info.message.clone(), stage, info.hook.clone())
        }
    }
}
