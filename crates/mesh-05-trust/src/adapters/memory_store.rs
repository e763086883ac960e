//! In-memory trust store. Clones share one record.

use crate::domain::{StoreError, TrustSnapshot};
use crate::ports::TrustStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    snapshot: Mutex<Option<TrustSnapshot>>,
    fail_writes: AtomicBool,
}

#[derive(Clone, Default)]
pub struct InMemoryTrustStore {
    inner: Arc<Inner>,
}

impl InMemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Option<TrustSnapshot> {
        self.inner.snapshot.lock().clone()
    }
}

impl TrustStore for InMemoryTrustStore {
    fn load(&self) -> Result<Option<TrustSnapshot>, StoreError> {
        Ok(self.inner.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &TrustSnapshot) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("injected write failure".into()));
        }
        *self.inner.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }
}
