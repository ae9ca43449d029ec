use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Client-side anti-spam flag.
///
/// Shared between the controller and the stdin reader. While locked, typed
/// lines are discarded instead of queued behind the running request.
#[derive(Debug, Clone, Default)]
pub struct InputGate {
    locked: Arc<AtomicBool>,
}

impl InputGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate for one submission. Fails if it is already locked.
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let gate = InputGate::new();
        let reader_side = gate.clone();
        assert!(!reader_side.is_locked());

        gate.lock();
        assert!(reader_side.is_locked());

        gate.unlock();
        assert!(!reader_side.is_locked());
    }

    #[test]
    fn test_try_lock_claims_once() {
        let gate = InputGate::new();
        assert!(gate.try_lock());
        assert!(!gate.clone().try_lock());

        // Locking again from the controller is harmless.
        gate.lock();
        assert!(gate.is_locked());

        gate.unlock();
        assert!(gate.try_lock());
    }
}
