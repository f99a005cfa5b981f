//! Testing utilities and fixtures
//!
//! Mocks for every external collaborator of a run (engine, verification,
//! classification), scripted hooks, and a [`TestContext`] that wires them
//! into an orchestrator.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

use crate::config::PipelineSettings;
use crate::error::Result;
use crate::hooks::{HookRegistry, HookStage};
use crate::orchestrator::PipelineOrchestrator;
use std::sync::Arc;

/// Registry, engine and settings for one test
pub struct TestContext {
    pub registry: HookRegistry,
    pub engine: MockEngine,
    pub settings: PipelineSettings,
}

impl TestContext {
    /// Empty registry, succeeding engine, fast timeouts
    pub fn new() -> Self {
        Self {
            registry: HookRegistry::new(),
            engine: MockEngine::new(),
            settings: fast_settings(),
        }
    }

    pub fn with_engine(mut self, engine: MockEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Register a scripted hook and return a handle sharing its call counter
    pub fn hook(&mut self, stage: HookStage, hook: ScriptedHook) -> Result<ScriptedHook> {
        let (boxed, handle) = hook.shared();
        self.registry.register(stage, boxed)?;
        Ok(handle)
    }

    /// Orchestrator over a snapshot of the current registry
    pub fn orchestrator(&self) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            Arc::new(self.registry.clone()),
            Arc::new(self.engine.clone()),
            self.settings,
        )
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
