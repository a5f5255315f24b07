use spdlog::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of "now" in milliseconds.
///
/// Windows assume the clock never goes backwards; a regressing clock surfaces as
/// [`WindowError::StaleTimestamp`](crate::WindowError::StaleTimestamp).
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock, read on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        wall_millis()
    }
}

fn wall_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Synthetic clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::Release);
    }

    /// Moves the clock forward and returns the new time.
    pub fn advance(&self, millis: u64) -> u64 {
        self.now.fetch_add(millis, Ordering::AcqRel) + millis
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

/// Wall clock cached in an atomic and refreshed by a background thread.
///
/// Reading it is a single atomic load, at the price of being up to one tick stale.
/// The refresher stops when the clock is dropped.
pub struct TickerClock {
    now: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    handler: Option<thread::JoinHandle<()>>,
}

impl TickerClock {
    pub fn new(tick: Duration) -> Self {
        let now = Arc::new(AtomicU64::new(wall_millis()));
        let running = Arc::new(AtomicBool::new(true));

        let handler = {
            let now = now.clone();
            let running = running.clone();
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    thread::sleep(tick);
                    now.fetch_max(wall_millis(), Ordering::Release);
                }
            })
        };
        debug!("[Clock] ticker started, tick={:?}", tick);

        Self {
            now,
            running,
            handler: Some(handler),
        }
    }
}

impl Default for TickerClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl Clock for TickerClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

impl Drop for TickerClock {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handler) = self.handler.take() {
            let _ = handler.join();
        }
        debug!("[Clock] ticker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(1000);
        assert_eq!(clock.now_millis(), 1000);
        assert_eq!(clock.advance(500), 1500);
        clock.set(42);
        assert_eq!(clock.now_millis(), 42);
    }

    #[test]
    fn test_ticker_clock_advances() {
        let clock = TickerClock::new(Duration::from_millis(1));
        let first = clock.now_millis();
        assert!(first > 0);
        thread::sleep(Duration::from_millis(20));
        assert!(clock.now_millis() > first);
    }

    #[test]
    fn test_system_clock_is_close_to_ticker() {
        let ticker = TickerClock::default();
        let diff = SystemClock.now_millis().abs_diff(ticker.now_millis());
        assert!(diff < 1000, "ticker drifted by {}ms", diff);
    }
}
