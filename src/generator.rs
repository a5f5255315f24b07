use crate::bucket::Bucket;
use crate::error::WindowError;
use crate::measure::LatencyHistogram;
use hdrhistogram::Histogram;
use std::marker::PhantomData;
use std::sync::Mutex;

/// Payload policy for a [`SliceWindow`](crate::SliceWindow).
///
/// Implementations must not call back into the window and must not panic.
pub trait BucketGenerator<T>: Send + Sync {
    /// Called when a slot is touched for the first time.
    fn new_empty_bucket(&self) -> T;

    /// Clears `bucket` in place and moves it to the slice starting at `start`.
    ///
    /// The bucket's identity must survive: handles obtained before the reset observe
    /// the reset content afterwards.
    fn reset_bucket_to(&self, bucket: &Bucket<T>, start: u64) {
        bucket.reset_to(start, self.new_empty_bucket());
    }
}

/// Produces `T::default()` for every new or reset bucket.
pub struct DefaultGenerator<T> {
    _v: PhantomData<fn() -> T>,
}

impl<T> DefaultGenerator<T> {
    pub fn new() -> Self {
        Self { _v: PhantomData }
    }
}

impl<T> Default for DefaultGenerator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> BucketGenerator<T> for DefaultGenerator<T> {
    fn new_empty_bucket(&self) -> T {
        T::default()
    }
}

/// Builds empty payloads from a closure.
pub struct FnGenerator<F> {
    make: F,
}

impl<F> FnGenerator<F> {
    pub fn new(make: F) -> Self {
        Self { make }
    }
}

impl<T, F> BucketGenerator<T> for FnGenerator<F>
where
    F: Fn() -> T + Send + Sync,
{
    fn new_empty_bucket(&self) -> T {
        (self.make)()
    }
}

/// Hands out empty latency histograms sharing the same bounds.
///
/// Each bucket owns its histogram behind a mutex so samples are recorded in place.
pub struct HistogramGenerator {
    template: Histogram<u64>,
}

impl HistogramGenerator {
    /// Histograms tracking `low..=high` with `sigfig` significant figures.
    pub fn new(low: u64, high: u64, sigfig: u8) -> Result<Self, WindowError> {
        let template = Histogram::<u64>::new_with_bounds(low, high, sigfig)?;
        Ok(Self { template })
    }

    /// 1ns to 1,000s at 3 significant figures.
    pub fn nanos() -> Result<Self, WindowError> {
        Self::new(1, 1_000_000_000_000, 3)
    }

    pub fn low(&self) -> u64 {
        self.template.low()
    }

    pub fn high(&self) -> u64 {
        self.template.high()
    }
}

impl BucketGenerator<LatencyHistogram> for HistogramGenerator {
    fn new_empty_bucket(&self) -> LatencyHistogram {
        Mutex::new(self.template.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reset_clears_payload() {
        let generator = DefaultGenerator::<u64>::new();
        let bucket = Bucket::new(1000, 42);
        generator.reset_bucket_to(&bucket, 2000);
        assert_eq!(bucket.start(), 2000);
        assert_eq!(*bucket.load(), 0);
    }

    #[test]
    fn test_fn_generator() {
        let generator = FnGenerator::new(|| vec![0u8; 4]);
        assert_eq!(generator.new_empty_bucket().len(), 4);
    }

    #[test]
    fn test_histogram_generator_bounds() {
        assert!(matches!(
            HistogramGenerator::new(10, 5, 3),
            Err(WindowError::Histogram(_))
        ));

        let generator = HistogramGenerator::nanos().unwrap();
        let h = generator.new_empty_bucket();
        assert_eq!(h.lock().unwrap().len(), 0);
        assert_eq!(generator.high(), 1_000_000_000_000);
    }
}
