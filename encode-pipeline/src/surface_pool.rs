use super::error::{PipelineError, Result};
use std::sync::{Condvar, Mutex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// The surface holds source data and can be submitted.
    Encodable,
    /// The surface was submitted and is waiting to be synced, drained, and refilled.
    PendingPostProcess,
}

struct PoolState {
    statuses: Vec<SurfaceStatus>,
    aborted: bool,
}

/// Readiness of a fixed set of source surface slots. Frames occupy slot `display_order % len`.
pub struct SurfacePool {
    state: Mutex<PoolState>,
    released: Condvar,
}

impl SurfacePool {
    pub fn new(len: usize) -> Self {
        Self {
            state: Mutex::new(PoolState {
                statuses: vec![SurfaceStatus::Encodable; len],
                aborted: false,
            }),
            released: Condvar::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("the lock should not be poisoned").statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn slot_for(&self, display_order: u64) -> usize {
        (display_order % self.len() as u64) as usize
    }

    pub fn status(&self, slot: usize) -> SurfaceStatus {
        self.state.lock().expect("the lock should not be poisoned").statuses[slot]
    }

    /// Blocks until the slot is encodable. Fails if the pool is aborted while waiting.
    pub fn wait_encodable(&self, slot: usize) -> Result<()> {
        let state = self.state.lock().expect("the lock should not be poisoned");
        let state = self
            .released
            .wait_while(state, |state| !state.aborted && state.statuses[slot] != SurfaceStatus::Encodable)
            .expect("the lock should not be poisoned");
        if state.aborted {
            return Err(PipelineError::PostProcessingAborted);
        }
        Ok(())
    }

    pub fn mark_pending(&self, slot: usize) {
        self.state.lock().expect("the lock should not be poisoned").statuses[slot] = SurfaceStatus::PendingPostProcess;
    }

    pub fn release(&self, slot: usize) {
        self.state.lock().expect("the lock should not be poisoned").statuses[slot] = SurfaceStatus::Encodable;
        self.released.notify_all();
    }

    /// Wakes and fails every current and future waiter.
    pub fn abort(&self) {
        self.state.lock().expect("the lock should not be poisoned").aborted = true;
        self.released.notify_all();
    }
}
