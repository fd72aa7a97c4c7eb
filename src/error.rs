//! Error types for the forecast-band library.

use thiserror::Error;

/// Result type alias for aggregation and scoring operations.
pub type Result<T> = std::result::Result<T, BandError>;

/// Errors that can occur while assembling or scoring forecasts.
///
/// Not-yet-determined rows and metric calls with nothing left to score are
/// not errors: both surface as NaN in the returned values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BandError {
    /// A forecast block disagrees with the shape an aggregator was built for.
    #[error("shape mismatch on {axis} axis: expected {expected}, got {got}")]
    ShapeMismatch {
        axis: &'static str,
        expected: usize,
        got: usize,
    },

    /// Arrays that must be aligned index-for-index have different shapes.
    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// Anchor time did not strictly increase (strict mode only).
    #[error("out-of-order ingest: anchor {got} does not follow {previous}")]
    OutOfOrderIngest { previous: usize, got: usize },

    /// Anchor overlaps or skips past the end of the previous block (strict mode only).
    #[error("non-contiguous ingest: expected anchor {expected}, got {got}")]
    AnchorGap { expected: usize, got: usize },

    /// Strict mode is on but the block carries no anchor.
    #[error("strict ordering requires an anchored forecast block")]
    MissingAnchor,

    /// Forecast values must be finite or NaN.
    #[error("infinite forecast value at batch {batch}, lag {lag}, feature {feature}")]
    InfiniteValue {
        batch: usize,
        lag: usize,
        feature: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },
}
