use crate::clock::Clock;
use crate::error::WindowError;
use crate::generator::DefaultGenerator;
use crate::options::SliceWindowOptions;
use crate::window::SliceWindow;
use std::sync::Arc;

/// Event counter over a sliding time window, e.g. for QPS or rate limiting.
pub struct RollingCounter {
    window: SliceWindow<u64>,
}

impl RollingCounter {
    pub fn new(options: SliceWindowOptions) -> Result<Self, WindowError> {
        let window = SliceWindow::builder()
            .options(options)
            .generator(DefaultGenerator::new())
            .build()?;
        Ok(Self { window })
    }

    pub fn with_clock(
        options: SliceWindowOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WindowError> {
        let window = SliceWindow::builder()
            .options(options)
            .generator(DefaultGenerator::new())
            .clock(clock)
            .build()?;
        Ok(Self { window })
    }

    pub fn add(&self, n: u64) -> Result<(), WindowError> {
        self.add_at(self.window.now_millis(), n)
    }

    pub fn add_at(&self, now: u64, n: u64) -> Result<(), WindowError> {
        let bucket = self.window.current_bucket_of_time(now)?;
        bucket.update(|count| count + n);
        Ok(())
    }

    pub fn sum(&self) -> u64 {
        self.sum_at(self.window.now_millis())
    }

    /// Total across every bucket still live at `now`.
    pub fn sum_at(&self, now: u64) -> u64 {
        self.window
            .values_with_time(now)
            .iter()
            .map(|bucket| bucket.with(|count| *count))
            .sum()
    }

    pub fn qps(&self) -> f64 {
        self.qps_at(self.window.now_millis())
    }

    /// Events per second averaged over the full window span.
    pub fn qps_at(&self, now: u64) -> f64 {
        self.sum_at(now) as f64 * 1000.0 / self.window.window_size_ms() as f64
    }

    pub fn window(&self) -> &SliceWindow<u64> {
        &self.window
    }
}
