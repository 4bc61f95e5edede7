use std::sync::Mutex;

use tracing::{error, info};

use super::{lock, Resource};
use crate::order::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    Occupy(Timestamp),
    Release(Timestamp),
}

/// A [`Resource`] that records every occupy and release and counts exclusivity violations.
#[derive(Debug, Default)]
pub struct Ledger {
    state: Mutex<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    holder: Option<Timestamp>,
    events: Vec<LedgerEvent>,
    violations: usize,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn events(&self) -> Vec<LedgerEvent> {
        lock(&self.state).events.clone()
    }
    /// Tokens in the order they occupied the resource
    pub fn grants(&self) -> Vec<Timestamp> {
        lock(&self.state)
            .events
            .iter()
            .filter_map(|e| match e {
                LedgerEvent::Occupy(ts) => Some(*ts),
                LedgerEvent::Release(_) => None,
            })
            .collect()
    }
    pub fn holder(&self) -> Option<Timestamp> {
        lock(&self.state).holder
    }
    pub fn violations(&self) -> usize {
        lock(&self.state).violations
    }
}

impl Resource for Ledger {
    fn occupy(&self, token: Timestamp) {
        let mut state = lock(&self.state);
        if let Some(holder) = state.holder {
            error!(%token, %holder, "occupied while held");
            state.violations += 1;
        }
        info!(%token, "occupy");
        state.holder = Some(token);
        state.events.push(LedgerEvent::Occupy(token));
    }

    fn release(&self, token: Timestamp) {
        let mut state = lock(&self.state);
        if state.holder != Some(token) {
            error!(%token, holder = ?state.holder, "released by non-holder");
            state.violations += 1;
        }
        info!(%token, "release");
        state.holder = None;
        state.events.push(LedgerEvent::Release(token));
    }
}
