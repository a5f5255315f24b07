//! Time-indexed ring buffer of statistics buckets for sliding-window metrics.
//!
//! A [`SliceWindow`] splits time into fixed intervals and maps each one onto a slot of a
//! fixed ring. Callers fetch the bucket for "now", mutate its payload, and periodically
//! read every bucket still inside the window to compute aggregates.

mod bucket;
mod clock;
mod counter;
mod error;
mod generator;
mod lock;
pub mod measure;
mod options;
mod window;

pub use crate::bucket::Bucket;
pub use crate::clock::{Clock, ManualClock, SystemClock, TickerClock};
pub use crate::counter::RollingCounter;
pub use crate::error::WindowError;
pub use crate::generator::{BucketGenerator, DefaultGenerator, FnGenerator, HistogramGenerator};
pub use crate::options::SliceWindowOptions;
pub use crate::window::{DeprecatedCallback, SliceWindow, SliceWindowBuilder};
