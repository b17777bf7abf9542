use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

// ─── Per-Key Debouncer ───

/// Coalesces bursts of triggers into one delayed execution per key.
///
/// Each call to [`Debouncer::schedule`] aborts any timer already pending
/// for the key and starts a fresh one, so only the trailing edge of a
/// burst fires. Keys are independent: a storm of events in one window
/// never delays another window's pass.
#[derive(Debug, Default)]
pub struct Debouncer<K: std::hash::Hash + Eq> {
    pending: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K: std::hash::Hash + Eq> Debouncer<K> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<K, JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule `action` to run after `delay`, replacing any pending
    /// timer for the same key. Handles of timers that already fired are
    /// swept here, so the map never outgrows the set of live timers.
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });
        let mut pending = self.pending();
        pending.retain(|_, h| !h.is_finished());
        if let Some(previous) = pending.insert(key, handle) {
            previous.abort();
        }
    }

    /// Cancel a pending timer without firing it.
    pub fn cancel(&self, key: &K) {
        if let Some(handle) = self.pending().remove(key) {
            handle.abort();
        }
    }

    /// Number of timers currently pending. Finished timers may still be
    /// counted until the next `schedule` sweeps them.
    pub fn pending_len(&self) -> usize {
        self.pending().len()
    }
}

// ─── Tests ───
