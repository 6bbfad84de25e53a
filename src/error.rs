//! Error types for the direction-estimation core.

use thiserror::Error;

/// Errors raised by the aggregation core and its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An ingest block whose length is not a whole number of channel groups.
    #[error("invalid frame size: {count} samples is not a multiple of {group}")]
    InvalidFrameSize { count: usize, group: usize },

    /// A registry lookup for a buffer name or code that does not exist.
    #[error("unknown buffer identifier: {0}")]
    UnknownBuffer(String),

    /// Analysis band outside `0 <= min < max <= fft_size / 2`.
    #[error("invalid analysis band [{min}, {max}) for frame size {fft_size}")]
    InvalidBand {
        min: usize,
        max: usize,
        fft_size: usize,
    },

    /// Frame size that is zero or not a power of two.
    #[error("frame size {0} must be a non-zero power of two")]
    InvalidFftSize(usize),

    /// Zero samples per microphone per callback.
    #[error("block size {0} must be at least one sample per microphone")]
    InvalidBlockSize(usize),
}

/// Convenience result type for the core.
pub type Result<T> = std::result::Result<T, Error>;
