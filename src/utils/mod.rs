//! Statistical helpers and forecast scoring.

pub mod metrics;
pub mod stats;

pub use metrics::{
    MaskedMetricEngine, MetricConfig, MetricReport, MetricScores, MetricState, DEFAULT_EPSILON,
};
pub use stats::{nan_mean, nan_median, nan_std};
