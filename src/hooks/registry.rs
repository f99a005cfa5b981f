//! Registry holding the ordered hook list for every stage

use super::{Hook, HookStage};
use crate::error::{AugmentError, ErrorCode, Result};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Ordered, per-stage collection of hooks.
///
/// Registration order is execution order. Build it at startup, then share it
/// as an `Arc`; runs only ever read from it.
#[derive(Clone, Default)]
pub struct HookRegistry {
    stages: [Vec<Arc<dyn Hook>>; 8],
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `hook` to the end of `stage`, or replace a hook with the same id in place.
    pub fn register(&mut self, stage: HookStage, hook: Arc<dyn Hook>) -> Result<()> {
        if hook.id().trim().is_empty() {
            return Err(AugmentError::configuration_with_code(
                ErrorCode::CONFIG_INVALID_HOOK,
                format!("Hook registered for stage '{}' has an empty id", stage),
            ));
        }

        let hooks = &mut self.stages[stage.index()];
        match hooks.iter().position(|h| h.id() == hook.id()) {
            Some(pos) => {
                tracing::debug!(stage = %stage, hook = hook.id(), "Replacing hook");
                hooks[pos] = hook;
            }
            None => {
                tracing::debug!(stage = %stage, hook = hook.id(), "Registering hook");
                hooks.push(hook);
            }
        }
        Ok(())
    }

    /// Remove a hook by id. Returns `true` if it was found and removed.
    pub fn unregister(&mut self, stage: HookStage, hook_id: &str) -> bool {
        let hooks = &mut self.stages[stage.index()];
        let before = hooks.len();
        hooks.retain(|h| h.id() != hook_id);
        hooks.len() < before
    }

    pub fn hooks_for(&self, stage: HookStage) -> &[Arc<dyn Hook>] {
        &self.stages[stage.index()]
    }

    pub fn hook_ids(&self, stage: HookStage) -> Vec<String> {
        self.hooks_for(stage)
            .iter()
            .map(|h| h.id().to_string())
            .collect()
    }

    /// Hook ids per stage, for status reporting
    pub fn list_hooks(&self) -> BTreeMap<HookStage, Vec<String>> {
        HookStage::ALL
            .iter()
            .map(|stage| (*stage, self.hook_ids(*stage)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.list_hooks()).finish()
    }
}

static GLOBAL_REGISTRY: Lazy<RwLock<Arc<HookRegistry>>> =
    Lazy::new(|| RwLock::new(Arc::new(HookRegistry::new())));

/// Replace the process-wide registry. Runs already holding a snapshot keep theirs.
pub fn install_global(registry: HookRegistry) {
    let mut guard = GLOBAL_REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    *guard = Arc::new(registry);
}

/// Snapshot of the process-wide registry
pub fn global_registry() -> Arc<HookRegistry> {
    GLOBAL_REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Reset the process-wide registry to empty
pub fn reset_global_registry() {
    install_global(HookRegistry::new());
}
