//! In-memory state store.
//!
//! Clones share one record, so a test can drop an engine and rebuild it from
//! the same store to simulate a restart.

use crate::domain::{PersistentState, StoreError};
use crate::ports::StateStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    state: Mutex<Option<PersistentState>>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    inner: Arc<Inner>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail, emulating a disk error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Option<PersistentState> {
        self.inner.state.lock().clone()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self) -> Result<Option<PersistentState>, StoreError> {
        Ok(self.inner.state.lock().clone())
    }

    fn save(&self, state: &PersistentState) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("injected write failure".into()));
        }
        *self.inner.state.lock() = Some(state.clone());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
