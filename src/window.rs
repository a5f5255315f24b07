use crate::bucket::Bucket;
use crate::clock::{Clock, SystemClock};
use crate::error::WindowError;
use crate::generator::BucketGenerator;
use crate::lock::TryLock;
use crate::options::SliceWindowOptions;
use arc_swap::ArcSwapOption;
use crossbeam_utils::Backoff;
use spdlog::{debug, trace, warn};
use std::sync::Arc;

/// Invoked with the live buckets right before a slot is rotated.
pub type DeprecatedCallback<T> = Box<dyn Fn(&[Arc<Bucket<T>>]) + Send + Sync>;

/// A fixed ring of time-sliced buckets covering the most recent `sample_count * interval_ms`.
///
/// Slot `i` holds the bucket for every interval whose index is congruent to `i` modulo
/// `sample_count`. Buckets are created lazily on first touch and afterwards reset in place
/// as time moves past them, so handles returned by [`current_bucket`](Self::current_bucket)
/// stay valid for the lifetime of the window.
///
/// Reading an up-to-date slot and filling an empty one are lock-free. Rotating a stale slot
/// goes through a single try-only update lock; losers back off and re-inspect the slot.
pub struct SliceWindow<T> {
    options: SliceWindowOptions,
    window_size_ms: u64,
    array: Box<[ArcSwapOption<Bucket<T>>]>,
    generator: Box<dyn BucketGenerator<T>>,
    clock: Arc<dyn Clock>,
    deprecated_callback: ArcSwapOption<DeprecatedCallback<T>>,
    update_lock: TryLock,
    deprecated_lock: TryLock,
}

impl<T> SliceWindow<T> {
    pub fn new(
        sample_count: usize,
        interval_ms: u64,
        generator: impl BucketGenerator<T> + 'static,
    ) -> Result<Self, WindowError> {
        Self::builder()
            .sample_count(sample_count)
            .interval_ms(interval_ms)
            .generator(generator)
            .build()
    }

    pub fn builder() -> SliceWindowBuilder<T> {
        SliceWindowBuilder::new()
    }

    /// The bucket covering the clock's current time.
    pub fn current_bucket(&self) -> Result<Arc<Bucket<T>>, WindowError> {
        self.current_bucket_of_time(self.clock.now_millis())
    }

    /// The bucket covering `now`, created or rotated as needed.
    ///
    /// Fails with [`WindowError::InvalidArgument`] for `now == 0` and with
    /// [`WindowError::StaleTimestamp`] when the slot for `now` already represents a later
    /// interval.
    pub fn current_bucket_of_time(&self, now: u64) -> Result<Arc<Bucket<T>>, WindowError> {
        if now == 0 {
            return Err(WindowError::InvalidArgument { now });
        }

        let idx = self.time_index(now);
        let bucket_start = self.bucket_start_of(now);
        let slot = &self.array[idx];
        let backoff = Backoff::new();

        loop {
            let current = slot.load();
            let old = match &*current {
                Some(old) => old,
                None => {
                    let fresh = Arc::new(Bucket::new(
                        bucket_start,
                        self.generator.new_empty_bucket(),
                    ));
                    let previous = slot.compare_and_swap(&current, Some(fresh.clone()));
                    if previous.is_none() {
                        trace!("[SliceWindow] slot {} created at {}", idx, bucket_start);
                        return Ok(fresh);
                    }
                    // Someone else filled the slot first.
                    continue;
                }
            };

            let old_start = old.start();
            if bucket_start == old_start {
                return Ok(old.clone());
            }
            if bucket_start < old_start {
                warn!(
                    "[SliceWindow] time {} is behind slot {} start {}",
                    bucket_start, idx, old_start
                );
                return Err(WindowError::StaleTimestamp {
                    requested: bucket_start,
                    current: old_start,
                });
            }

            self.notify_deprecated(now);
            if let Some(_guard) = self.update_lock.try_lock() {
                // Another rotator may have moved this slot while we were waiting.
                if old.start() < bucket_start {
                    self.generator.reset_bucket_to(old, bucket_start);
                    trace!(
                        "[SliceWindow] slot {} rotated {} -> {}",
                        idx, old_start, bucket_start
                    );
                    return Ok(old.clone());
                }
                continue;
            }
            backoff.snooze();
        }
    }

    /// Live buckets at the clock's current time.
    pub fn values(&self) -> Vec<Arc<Bucket<T>>> {
        self.values_with_time(self.clock.now_millis())
    }

    /// Buckets that have not expired relative to `now`, in slot order.
    ///
    /// A bucket expires once `now - start > window_size_ms + interval_ms`. Never allocates
    /// slots or takes the update lock.
    ///
    /// A bucket whose start lies after `now` (a reader whose clock lags a writer's) is kept
    /// as live. Wrapping the unsigned difference would instead report it as expired, as the
    /// Go `slicewindow` package does; this window deliberately does not.
    pub fn values_with_time(&self, now: u64) -> Vec<Arc<Bucket<T>>> {
        if now == 0 {
            return Vec::new();
        }
        let mut ret = Vec::with_capacity(self.array.len());
        for slot in self.array.iter() {
            if let Some(bucket) = slot.load_full() {
                if !self.is_deprecated(now, bucket.start()) {
                    ret.push(bucket);
                }
            }
        }
        ret
    }

    /// Replaces the rotation callback. Last write wins; set it before first use to
    /// avoid racing an in-flight notification.
    pub fn set_deprecated_callback(
        &self,
        callback: impl Fn(&[Arc<Bucket<T>>]) + Send + Sync + 'static,
    ) {
        let callback: DeprecatedCallback<T> = Box::new(callback);
        self.deprecated_callback.store(Some(Arc::new(callback)));
    }

    pub fn clear_deprecated_callback(&self) {
        self.deprecated_callback.store(None);
    }

    pub fn sample_count(&self) -> usize {
        self.options.sample_count
    }

    pub fn interval_ms(&self) -> u64 {
        self.options.interval_ms
    }

    pub fn window_size_ms(&self) -> u64 {
        self.window_size_ms
    }

    pub fn options(&self) -> SliceWindowOptions {
        self.options
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Slot holding the interval that contains `now`.
    pub fn time_index(&self, now: u64) -> usize {
        ((now / self.options.interval_ms) % self.options.sample_count as u64) as usize
    }

    /// `now` truncated to its interval boundary.
    pub fn bucket_start_of(&self, now: u64) -> u64 {
        now - now % self.options.interval_ms
    }

    fn is_deprecated(&self, now: u64, bucket_start: u64) -> bool {
        now.saturating_sub(bucket_start) > self.window_size_ms + self.options.interval_ms
    }

    fn notify_deprecated(&self, now: u64) {
        let callback = self.deprecated_callback.load();
        if let Some(callback) = &*callback {
            if let Some(_guard) = self.deprecated_lock.try_lock() {
                let values = self.values_with_time(now);
                callback(&values);
            }
        }
    }
}

/// Assembles a [`SliceWindow`] and its optional collaborators.
pub struct SliceWindowBuilder<T> {
    options: SliceWindowOptions,
    generator: Option<Box<dyn BucketGenerator<T>>>,
    clock: Option<Arc<dyn Clock>>,
    deprecated_callback: Option<DeprecatedCallback<T>>,
}

impl<T> SliceWindowBuilder<T> {
    pub fn new() -> Self {
        Self {
            options: SliceWindowOptions::default(),
            generator: None,
            clock: None,
            deprecated_callback: None,
        }
    }

    pub fn options(mut self, options: SliceWindowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sample_count(mut self, sample_count: usize) -> Self {
        self.options.sample_count = sample_count;
        self
    }

    pub fn interval_ms(mut self, interval_ms: u64) -> Self {
        self.options.interval_ms = interval_ms;
        self
    }

    pub fn generator(mut self, generator: impl BucketGenerator<T> + 'static) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn deprecated_callback(
        mut self,
        callback: impl Fn(&[Arc<Bucket<T>>]) + Send + Sync + 'static,
    ) -> Self {
        self.deprecated_callback = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> Result<SliceWindow<T>, WindowError> {
        self.options.validate()?;
        let generator = self
            .generator
            .ok_or_else(|| WindowError::config("bucket generator is missing"))?;

        let array = (0..self.options.sample_count)
            .map(|_| ArcSwapOption::empty())
            .collect();

        debug!(
            "[SliceWindow] created sample_count={}, interval_ms={}",
            self.options.sample_count, self.options.interval_ms
        );

        Ok(SliceWindow {
            options: self.options,
            window_size_ms: self.options.window_size_ms(),
            array,
            generator,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            deprecated_callback: ArcSwapOption::new(self.deprecated_callback.map(Arc::new)),
            update_lock: TryLock::new(),
            deprecated_lock: TryLock::new(),
        })
    }
}

impl<T> Default for SliceWindowBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
