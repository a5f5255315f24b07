use arc_swap::ArcSwap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A timestamped statistics cell.
///
/// A bucket is allocated once per slot and then reset in place every time its slot
/// moves on to a newer time slice, so an `Arc<Bucket<T>>` handed out earlier keeps
/// pointing at whatever the slot currently represents.
///
/// The payload lives behind an atomic pointer swap: readers always see a whole value,
/// writers replace it wholesale rather than mutating it.
pub struct Bucket<T> {
    start: AtomicU64,
    value: ArcSwap<T>,
}

impl<T> Bucket<T> {
    pub fn new(start: u64, value: T) -> Self {
        Self {
            start: AtomicU64::new(start),
            value: ArcSwap::from_pointee(value),
        }
    }

    /// Start of the time slice this bucket currently represents, in milliseconds.
    pub fn start(&self) -> u64 {
        self.start.load(Ordering::Acquire)
    }

    pub fn load(&self) -> Arc<T> {
        self.value.load_full()
    }

    /// Borrows the payload without touching its reference count.
    pub fn with<R>(&self, handler: impl FnOnce(&T) -> R) -> R {
        let guard = self.value.load();
        handler(&guard)
    }

    pub fn store(&self, value: T) {
        self.value.store(Arc::new(value));
    }

    /// Replaces the payload with `f(current)`, retrying if another writer got in first.
    ///
    /// `f` may run more than once and must not have side effects.
    pub fn update(&self, mut f: impl FnMut(&T) -> T) {
        self.value.rcu(|current: &Arc<T>| f(current));
    }

    /// Moves the bucket to a new time slice with a fresh payload.
    ///
    /// The payload is published before the start so a reader that sees the new start
    /// never pairs it with the previous slice's data.
    pub fn reset_to(&self, start: u64, value: T) {
        self.value.store(Arc::new(value));
        self.start.store(start, Ordering::Release);
    }
}

impl<T: Debug> Debug for Bucket<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("start", &self.start())
            .field("value", &self.load())
            .finish()
    }
}
