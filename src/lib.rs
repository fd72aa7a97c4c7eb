//! # forecast-band
//!
//! Windowed assembly and scoring of overlapping multi-step-ahead forecasts.
//!
//! A model emits forecast blocks of shape `(batch_size, horizon, feature_dim)`
//! where row `b`, column `h` predicts timestep `anchor + b + h`. Consecutive
//! blocks overlap, so every timestep is predicted up to `horizon` times.
//! This crate provides three consumers of such blocks:
//!
//! - [`RollingBandAggregator`](aggregation::RollingBandAggregator) keeps a
//!   short rolling window and yields a median point estimate plus an
//!   edge-corrected standard deviation per timestep.
//! - [`SequentialAssembler`](aggregation::SequentialAssembler) keeps every
//!   block and reconstructs one averaged value per timestep at the end.
//! - [`MaskedMetricEngine`](utils::MaskedMetricEngine) scores predictions
//!   against ground truth while skipping masked and zero-valued truth.
//!
//! NaN is the "not yet known" signal throughout: undetermined band rows and
//! metrics with nothing to average are NaN rather than errors.

#![allow(clippy::needless_range_loop)]

pub mod aggregation;
pub mod core;
pub mod error;
pub mod utils;

pub use error::{BandError, Result};

pub mod prelude {
    pub use crate::aggregation::{
        AssemblerConfig, BandConfig, RollingBandAggregator, SequentialAssembler,
    };
    pub use crate::core::{AssembledSeries, BandEstimate, ForecastBlock};
    pub use crate::error::{BandError, Result};
    pub use crate::utils::{
        MaskedMetricEngine, MetricConfig, MetricReport, MetricScores, MetricState,
    };
}
