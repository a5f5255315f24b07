use std::sync::atomic::{AtomicBool, Ordering};

/// A non-reentrant lock that can only be tried, never waited on.
///
/// Callers that fail to acquire it decide themselves whether to back off and retry.
#[derive(Debug, Default)]
pub(crate) struct TryLock {
    locked: AtomicBool,
}

/// Releases the owning [`TryLock`] when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub(crate) struct TryLockGuard<'a> {
    lock: &'a TryLock,
}

impl TryLock {
    pub(crate) const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    pub(crate) fn try_lock(&self) -> Option<TryLockGuard<'_>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| TryLockGuard { lock: self })
    }
}

impl Drop for TryLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
