//! Single-flight admission control for the generation engine
//!
//! The engine can only run one generation at a time. Instead of queueing,
//! the gateway rejects any request that arrives while a generation is in
//! flight; clients poll until the slot frees up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::debug;

/// Process-wide "generation in flight" flag
#[derive(Debug, Default)]
pub struct ProcessingLock {
    busy: AtomicBool,
}

impl ProcessingLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot if it is free.
    ///
    /// The slot is held until the returned guard is dropped, whichever path
    /// the request takes (success, error, early return or panic).
    pub fn try_acquire(self: &Arc<Self>) -> Option<ProcessingGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        debug!("Processing lock acquired");
        Some(ProcessingGuard {
            lock: Arc::clone(self),
            acquired_at: Instant::now(),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holding this means owning the engine. Can be moved into a spawned task.
#[derive(Debug)]
pub struct ProcessingGuard {
    lock: Arc<ProcessingLock>,
    acquired_at: Instant,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.lock.busy.store(false, Ordering::Release);
        debug!(
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Processing lock released"
        );
    }
}
