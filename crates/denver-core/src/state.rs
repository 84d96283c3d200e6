use std::sync::{Arc, Mutex};

/// Health of the instance as last observed by the probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceState {
    pub live: bool,
    pub os_ready: bool,
    pub all_systems_ready: bool,
}

impl InstanceState {
    pub fn powered_off() -> Self {
        Self::default()
    }
}

/// Edge between two published states, as far as hooks are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessTransition {
    Unchanged,
    BecameReady,
    LostReadiness,
}

impl ReadinessTransition {
    pub fn between(old: &InstanceState, new: &InstanceState) -> Self {
        match (old.all_systems_ready, new.all_systems_ready) {
            (false, true) => Self::BecameReady,
            (true, false) => Self::LostReadiness,
            (false, false) | (true, true) => Self::Unchanged,
        }
    }

    pub fn runs_post_start_actions(self) -> bool {
        matches!(self, Self::BecameReady)
    }
}

/// Shared, explicitly owned state value. The probe writes it, everyone else
/// reads snapshots.
#[derive(Debug, Clone, Default)]
pub struct StateCell {
    inner: Arc<Mutex<InstanceState>>,
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> InstanceState {
        *self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `state` and returns the value it replaced.
    pub fn replace(&self, state: InstanceState) -> InstanceState {
        let mut current = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *current, state)
    }
}
