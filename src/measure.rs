use crate::bucket::Bucket;
use crate::error::WindowError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub use hdrhistogram::Histogram;

/// Payload of a latency bucket. Samples are recorded in place under the mutex;
/// rotation swaps in a fresh one.
pub type LatencyHistogram = Mutex<Histogram<u64>>;

/// Percentiles over every live bucket of a latency window, all in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyStats {
    /// Samples across all merged buckets.
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
}

/// Records one sample into a histogram bucket.
///
/// Values outside the histogram's range are clamped to it, so the histogram never grows.
pub fn record(bucket: &Bucket<LatencyHistogram>, duration: Duration) {
    let nanos = duration.as_nanos().min(u64::MAX as u128) as u64;
    bucket.with(|histogram| {
        let mut histogram = lock(histogram);
        let value = nanos.clamp(histogram.low(), histogram.high());
        histogram.saturating_record(value);
    });
}

/// Merges every bucket into a single histogram and reads its percentiles.
pub fn summarize(buckets: &[Arc<Bucket<LatencyHistogram>>]) -> Result<LatencyStats, WindowError> {
    let Some((first, rest)) = buckets.split_first() else {
        return Ok(LatencyStats::default());
    };

    let mut merged = first.with(|histogram| lock(histogram).clone());
    for bucket in rest {
        bucket.with(|histogram| merged.add(&*lock(histogram)))?;
    }

    if merged.len() == 0 {
        return Ok(LatencyStats::default());
    }

    Ok(LatencyStats {
        count: merged.len(),
        min: merged.min(),
        max: merged.max(),
        mean: merged.mean(),
        p50: merged.value_at_quantile(0.5),
        p90: merged.value_at_quantile(0.9),
        p99: merged.value_at_quantile(0.99),
        p999: merged.value_at_quantile(0.999),
    })
}

// A panic while recording leaves the counts usable; keep going with them.
fn lock(histogram: &LatencyHistogram) -> MutexGuard<'_, Histogram<u64>> {
    histogram.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LatencyStats {
    pub fn format_stats(&self) -> String {
        if self.count == 0 {
            return "No stats collected yet".into();
        }

        let percentiles = [
            ("min", self.min as f64),
            ("max", self.max as f64),
            ("mean", self.mean),
            ("p50", self.p50 as f64),
            ("p90", self.p90 as f64),
            ("p99", self.p99 as f64),
            ("p999", self.p999 as f64),
        ];
        let mut out = format!("\tcount={}", self.count);
        for (name, nanos) in percentiles {
            out.push_str(&format!(",\t{}={}", name, format_nanos(nanos)));
        }
        out
    }
}

fn format_nanos(nanos: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e9, "s"), (1e6, "ms"), (1e3, "us")];
    for (scale, unit) in UNITS {
        if nanos >= scale {
            return format!("{:.2}{}", nanos / scale, unit);
        }
    }
    format!("{:.0}ns", nanos)
}
