use hdrhistogram::{AdditionError, CreationError};

/// Errors surfaced by window construction and bucket acquisition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// Construction parameters are unusable.
    #[error("invalid window configuration: {reason}")]
    Config { reason: String },

    /// Timestamps must be strictly positive.
    #[error("current time must be positive, got {now}")]
    InvalidArgument { now: u64 },

    /// The requested time falls behind a slot that has already rotated forward.
    #[error("provided time {requested} is already behind bucket start {current}")]
    StaleTimestamp { requested: u64, current: u64 },

    #[error("invalid histogram bounds: {0}")]
    Histogram(#[from] CreationError),

    #[error("histograms cannot be merged: {0}")]
    HistogramMerge(#[from] AdditionError),
}

impl WindowError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        WindowError::Config {
            reason: reason.into(),
        }
    }
}
