//! Connection state shared between the client handle and its worker.
//!
//! Every worker carries the generation it was started with. Worker-side
//! updates only land while that generation is still current, so a
//! superseded or disconnected worker can never resurrect state the caller
//! believes is gone.

use std::sync::{Mutex, MutexGuard, PoisonError};

use callwire_common::CallId;

use crate::types::{ConnectionStatus, ReadyState};

#[derive(Debug, Default)]
pub(crate) struct StateInner {
    pub(crate) generation: u64,
    pub(crate) connected: bool,
    pub(crate) ready_state: Option<ReadyState>,
    pub(crate) reconnect_attempts: u32,
}

#[derive(Debug, Default)]
pub(crate) struct SharedState {
    inner: Mutex<StateInner>,
    /// Calls subscribed while connected, in first-subscribe order.
    calls: Mutex<Vec<CallId>>,
}

impl SharedState {
    fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<CallId>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new worker generation in the connecting state.
    pub(crate) fn begin_generation(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.connected = false;
        inner.ready_state = Some(ReadyState::Connecting);
        inner.generation
    }

    /// Invalidate the running worker and drop the transport state.
    pub(crate) fn terminate(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.connected = false;
        inner.ready_state = None;
    }

    /// Apply `update` if `generation` is still current. Returns whether it
    /// was applied.
    pub(crate) fn update(&self, generation: u64, update: impl FnOnce(&mut StateInner)) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        update(&mut inner);
        true
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub(crate) fn reconnect_attempts(&self) -> u32 {
        self.lock().reconnect_attempts
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        let inner = self.lock();
        ConnectionStatus {
            is_connected: inner.connected,
            reconnect_attempts: inner.reconnect_attempts,
            ready_state: inner.ready_state,
        }
    }

    // -- tracked calls ------------------------------------------------------

    pub(crate) fn track_call(&self, call_id: CallId) -> bool {
        let mut calls = self.lock_calls();
        if calls.contains(&call_id) {
            return false;
        }
        calls.push(call_id);
        true
    }

    pub(crate) fn forget_call(&self, call_id: &CallId) -> bool {
        let mut calls = self.lock_calls();
        let before = calls.len();
        calls.retain(|tracked| tracked != call_id);
        calls.len() != before
    }

    pub(crate) fn tracked_calls(&self) -> Vec<CallId> {
        self.lock_calls().clone()
    }
}
