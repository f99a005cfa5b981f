//! Mock engine, hooks and services for pipeline tests

use crate::error::{AugmentError, ErrorCode, Result};
use crate::hooks::{Hook, HookError, HookResult};
use crate::services::{
    ClassificationReport, ClassificationService, EngineOutput, ImageRef, TransformEngine,
    VerificationReport, VerificationService,
};
use crate::session::{ContextPatch, HookContext};
use crate::transform::TransformPipelineSpec;
use crate::validation::ValidatedSpec;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a [`MockEngine`] does when called
#[derive(Debug, Clone)]
pub enum EngineBehavior {
    Succeed,
    Fail(String),
    /// Sleep before succeeding
    Delay(Duration),
    Panic(String),
}

/// Transform engine with scripted behavior and a call counter
#[derive(Debug, Clone)]
pub struct MockEngine {
    behavior: EngineBehavior,
    calls: Arc<AtomicUsize>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_behavior(EngineBehavior::Succeed)
    }

    pub fn with_behavior(behavior: EngineBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self::with_behavior(EngineBehavior::Fail(message.to_string()))
    }

    pub fn slow(delay: Duration) -> Self {
        Self::with_behavior(EngineBehavior::Delay(delay))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransformEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn apply(&self, image: &ImageRef, spec: &ValidatedSpec, seed: u32) -> Result<EngineOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            EngineBehavior::Succeed => {}
            EngineBehavior::Fail(message) => {
                return Err(AugmentError::transform_execution_with_code(
                    ErrorCode::TRANSFORM_ENGINE_FAILED,
                    message.clone(),
                ));
            }
            EngineBehavior::Delay(delay) => tokio::time::sleep(*delay).await,
            EngineBehavior::Panic(message) => panic!("{}", message),
        }

        Ok(EngineOutput {
            image: ImageRef::new(
                format!("{}-mock-{}", image.id(), seed),
                image.width(),
                image.height(),
            ),
            metadata: BTreeMap::from([
                ("engine".to_string(), json!("mock")),
                ("applied".to_string(), json!(spec.transform_names())),
            ]),
        })
    }
}

/// What a [`ScriptedHook`] does when run
#[derive(Debug, Clone)]
pub enum HookBehavior {
    Continue,
    Skip(String),
    Abort(String),
    Fail(String),
    /// Report its own timeout without waiting
    TimedOut(Duration),
    /// Sleep before continuing
    Sleep(Duration),
    Panic(String),
    /// Continue with the given patch
    Patch(ContextPatch),
}

/// Hook with scripted behavior.
///
/// Hooks sharing a log via [`ScriptedHook::with_log`] append their id on
/// every run, which lets tests assert execution order.
#[derive(Debug, Clone)]
pub struct ScriptedHook {
    id: String,
    behavior: HookBehavior,
    timeout: Option<Duration>,
    calls: Arc<AtomicUsize>,
    log: Option<Arc<Mutex<Vec<String>>>>,
}

impl ScriptedHook {
    pub fn new(id: &str, behavior: HookBehavior) -> Self {
        Self {
            id: id.to_string(),
            behavior,
            timeout: None,
            calls: Arc::new(AtomicUsize::new(0)),
            log: None,
        }
    }

    pub fn continuing(id: &str) -> Self {
        Self::new(id, HookBehavior::Continue)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Boxed for registration, keeping a clone that shares the call counter
    pub fn shared(self) -> (Arc<dyn Hook>, ScriptedHook) {
        let handle = self.clone();
        (Arc::new(self), handle)
    }
}

#[async_trait]
impl Hook for ScriptedHook {
    fn id(&self) -> &str {
        &self.id
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn run(&self, _ctx: &HookContext) -> std::result::Result<HookResult, HookError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().unwrap_or_else(|e| e.into_inner()).push(self.id.clone());
        }
        match &self.behavior {
            HookBehavior::Continue => Ok(HookResult::proceed()),
            HookBehavior::Skip(reason) => Ok(HookResult::skip(reason.clone())),
            HookBehavior::Abort(reason) => Ok(HookResult::abort(reason.clone())),
            HookBehavior::Fail(reason) => Err(HookError::failed(reason.clone())),
            HookBehavior::TimedOut(timeout) => Err(HookError::Timeout { timeout: *timeout }),
            HookBehavior::Sleep(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(HookResult::proceed())
            }
            HookBehavior::Panic(message) => panic!("{}", message),
            HookBehavior::Patch(patch) => Ok(HookResult::proceed().with_patch(patch.clone())),
        }
    }
}

/// How a mock verification or classification service answers
#[derive(Debug, Clone)]
pub enum ServiceBehavior {
    /// Report a match / consistent class
    Pass,
    /// Report a mismatch / changed class
    Mismatch,
    Fail(String),
    /// Sleep before passing
    Delay(Duration),
}

impl ServiceBehavior {
    async fn respond(&self) -> Result<bool> {
        match self {
            ServiceBehavior::Pass => Ok(true),
            ServiceBehavior::Mismatch => Ok(false),
            ServiceBehavior::Fail(message) => Err(AugmentError::optional_stage(
                ErrorCode::OPTIONAL_SERVICE_FAILED,
                message.clone(),
                None,
            )),
            ServiceBehavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(true)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockVerificationService {
    behavior: ServiceBehavior,
    calls: Arc<AtomicUsize>,
}

impl MockVerificationService {
    pub fn new(behavior: ServiceBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationService for MockVerificationService {
    async fn compare(
        &self,
        _original: &ImageRef,
        _transformed: &ImageRef,
        spec: &TransformPipelineSpec,
    ) -> Result<VerificationReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let matches_intent = self.behavior.respond().await?;
        Ok(VerificationReport {
            matches_intent,
            confidence: if matches_intent { 0.9 } else { 0.2 },
            notes: spec
                .transform_names()
                .into_iter()
                .map(|name| format!("checked {}", name))
                .collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MockClassificationService {
    behavior: ServiceBehavior,
    calls: Arc<AtomicUsize>,
}

impl MockClassificationService {
    pub fn new(behavior: ServiceBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationService for MockClassificationService {
    async fn classify_consistency(
        &self,
        _original: &ImageRef,
        _transformed: &ImageRef,
    ) -> Result<ClassificationReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let consistent = self.behavior.respond().await?;
        Ok(ClassificationReport {
            original_label: "cat".to_string(),
            transformed_label: if consistent { "cat" } else { "dog" }.to_string(),
            consistent,
            confidence: 0.8,
        })
    }
}
