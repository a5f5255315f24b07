use crate::error::WindowError;

/// Shape of a slice window: how many buckets it keeps and how long each one spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceWindowOptions {
    /// Number of bucket slots in the ring.
    pub sample_count: usize,
    /// Length of the time slice each bucket represents, in milliseconds.
    pub interval_ms: u64,
}

impl SliceWindowOptions {
    pub fn new(sample_count: usize, interval_ms: u64) -> Self {
        Self {
            sample_count,
            interval_ms,
        }
    }

    pub fn validate(&self) -> Result<(), WindowError> {
        if self.sample_count == 0 || self.interval_ms == 0 {
            return Err(WindowError::config(format!(
                "interval_ms is {}, sample_count is {}",
                self.interval_ms, self.sample_count
            )));
        }
        self.checked_window_size_ms().map(|_| ())
    }

    /// Total span covered by the ring.
    ///
    /// Only meaningful once [`validate`](Self::validate) has succeeded.
    pub fn window_size_ms(&self) -> u64 {
        self.interval_ms.saturating_mul(self.sample_count as u64)
    }

    fn checked_window_size_ms(&self) -> Result<u64, WindowError> {
        u64::try_from(self.sample_count)
            .ok()
            .and_then(|count| count.checked_mul(self.interval_ms))
            .and_then(|size| size.checked_add(self.interval_ms).map(|_| size))
            .ok_or_else(|| {
                WindowError::config(format!(
                    "window of {} x {}ms overflows",
                    self.sample_count, self.interval_ms
                ))
            })
    }
}

impl Default for SliceWindowOptions {
    fn default() -> Self {
        Self::new(5, 1000)
    }
}
