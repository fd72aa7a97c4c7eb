//! Streaming band aggregation over overlapping forecast blocks.
//!
//! Each incoming block is written diagonally into a rolling buffer indexed by
//! `(time row, lag, feature)`: value `block[b, f, :]` lands in row `b + f`,
//! lag column `f`, so every row collects the forecasts made for the same
//! absolute timestep. The lag axis is then collapsed with a NaN-ignoring
//! median (point estimate) and standard deviation (band width), and the
//! standard deviation is corrected near the window edges.
//!
//! Blocks must arrive in strictly increasing, contiguous anchor order. Strict
//! mode enforces this and labels rows with absolute anchor times.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use super::decay::apply_decay;
use super::order::OrderGuard;
use super::ring::LagRing;
use super::validate_window;
use crate::core::{BandEstimate, ForecastBlock};
use crate::error::Result;
use crate::utils::stats::{nan_count, nan_median, nan_std};

/// Configuration for [`RollingBandAggregator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Number of future steps each block predicts.
    pub horizon: usize,
    /// Number of target features.
    pub feature_dim: usize,
    /// Reject blocks whose anchor does not continue the previous block.
    #[serde(default)]
    pub strict_order: bool,
}

impl BandConfig {
    pub fn new(horizon: usize, feature_dim: usize) -> Self {
        Self {
            horizon,
            feature_dim,
            strict_order: false,
        }
    }

    /// Require anchored blocks in contiguous anchor order.
    pub fn with_strict_order(mut self, strict: bool) -> Self {
        self.strict_order = strict;
        self
    }
}

/// Rolling median/std band over overlapping multi-step forecasts.
#[derive(Debug, Clone)]
pub struct RollingBandAggregator {
    config: BandConfig,
    buffer: LagRing,
    origin: usize,
    estimate: BandEstimate,
    guard: Option<OrderGuard>,
}

impl RollingBandAggregator {
    /// Allocate an all-NaN buffer of `horizon - 1` rows.
    pub fn new(config: BandConfig) -> Result<Self> {
        validate_window(config.horizon, config.feature_dim)?;
        let carry = config.horizon - 1;
        Ok(Self {
            buffer: LagRing::filled_nan(carry, config.horizon, config.feature_dim),
            origin: 0,
            estimate: BandEstimate::undetermined(carry, config.feature_dim),
            guard: config.strict_order.then(OrderGuard::default),
            config,
        })
    }

    pub fn config(&self) -> &BandConfig {
        &self.config
    }

    pub fn horizon(&self) -> usize {
        self.config.horizon
    }

    /// The most recent band.
    pub fn estimate(&self) -> &BandEstimate {
        &self.estimate
    }

    /// Time index of the buffer's first row. Strict mode counts from the
    /// first block's anchor, otherwise from zero.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Snapshot of the rolling buffer, `(rows, horizon, feature_dim)`.
    pub fn buffer(&self) -> Array3<f64> {
        self.buffer.to_array()
    }

    /// Fold one forecast block into the band.
    ///
    /// An empty block leaves every piece of state untouched.
    pub fn ingest(&mut self, block: ForecastBlock) -> Result<&BandEstimate> {
        block.check_shape(self.config.horizon, self.config.feature_dim)?;
        if block.is_empty() {
            return Ok(&self.estimate);
        }
        let (anchor, fresh) = match &self.guard {
            Some(guard) => (Some(guard.check(&block)?), guard.is_fresh()),
            None => (None, false),
        };

        let horizon = self.config.horizon;
        let batch_size = block.batch_size();

        if let (true, Some(anchor)) = (fresh, anchor) {
            self.origin = anchor;
        }
        self.origin += self.buffer.retain_last(horizon - 1);
        self.buffer.push_nan_rows(batch_size);
        self.write_diagonal(&block);
        self.estimate = self.collapse(batch_size);

        if let (Some(guard), Some(anchor)) = (self.guard.as_mut(), anchor) {
            guard.accept(anchor, batch_size);
        }

        tracing::debug!(
            origin = self.origin,
            batch_size,
            horizon,
            rows = self.estimate.rows(),
            "forecast block folded into rolling band"
        );
        Ok(&self.estimate)
    }

    fn write_diagonal(&mut self, block: &ForecastBlock) {
        for lag in 0..self.config.horizon {
            for (b, values) in block.lag(lag).outer_iter().enumerate() {
                let mut slot = self.buffer.slot_mut(b + lag, lag);
                if slot.iter().any(|v| !v.is_nan()) {
                    tracing::warn!(row = b + lag, lag, "overwriting an occupied lag slot");
                }
                slot.assign(&values);
            }
        }
    }

    fn collapse(&self, finalized: usize) -> BandEstimate {
        let rows = self.buffer.len();
        let features = self.config.feature_dim;
        let mut median = Array2::from_elem((rows, features), f64::NAN);
        let mut std = Array2::from_elem((rows, features), f64::NAN);
        let mut support = Array2::zeros((rows, features));

        for t in 0..rows {
            for k in 0..features {
                let lane = self.buffer.lane(t, k);
                median[[t, k]] = nan_median(lane.iter().copied());
                std[[t, k]] = nan_std(lane.iter().copied());
                support[[t, k]] = nan_count(lane.iter().copied());
            }
        }

        apply_decay(&mut std, self.config.horizon);
        BandEstimate::new(self.origin, finalized, median, std, support)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BandError;
    use approx::assert_relative_eq;

    /// Block whose value at `(b, f)` is `base + b + f` (the target time index),
    /// so every lag agrees on the value of a timestep.
    fn consistent_block(anchor: usize, batch: usize, horizon: usize) -> ForecastBlock {
        let values =
            Array3::from_shape_fn((batch, horizon, 1), |(b, f, _)| (anchor + b + f) as f64);
        ForecastBlock::new(values).unwrap().with_anchor(anchor)
    }

    fn bits(values: &Array3<f64>) -> Vec<u64> {
        values.iter().map(|v| v.to_bits()).collect()
    }

    #[test]
    fn initial_estimate_is_undetermined() {
        let agg = RollingBandAggregator::new(BandConfig::new(4, 2)).unwrap();
        let band = agg.estimate();

        assert_eq!(band.rows(), 3);
        assert_eq!(band.feature_dim(), 2);
        assert!(band.median().iter().all(|v| v.is_nan()));
        assert!(band.std().iter().all(|&v| v == 0.0));
        assert_eq!(agg.buffer().dim(), (3, 4, 2));
    }

    #[test]
    fn zero_horizon_is_rejected() {
        assert!(matches!(
            RollingBandAggregator::new(BandConfig::new(0, 1)),
            Err(BandError::InvalidParameter(_))
        ));
    }

    #[test]
    fn diagonal_write_aligns_lags_by_target_time() {
        let mut agg = RollingBandAggregator::new(BandConfig::new(3, 1)).unwrap();
        agg.ingest(consistent_block(0, 2, 3)).unwrap();

        // rows 0..4 hold times 0..4; row t, lag f came from batch row t - f
        let buffer = agg.buffer();
        assert_eq!(buffer.dim(), (4, 3, 1));
        assert_eq!(buffer[[0, 0, 0]], 0.0);
        assert!(buffer[[0, 1, 0]].is_nan());
        assert_eq!(buffer[[1, 0, 0]], 1.0);
        assert_eq!(buffer[[1, 1, 0]], 1.0);
        assert_eq!(buffer[[3, 2, 0]], 3.0);
        assert!(buffer[[3, 0, 0]].is_nan());

        let band = agg.estimate();
        for t in 0..4 {
            assert_relative_eq!(band.median()[[t, 0]], t as f64);
        }
        assert_eq!(band.support().column(0).to_vec(), vec![1, 2, 2, 1]);
    }

    #[test]
    fn window_slides_and_keeps_horizon_minus_one_rows() {
        let mut agg = RollingBandAggregator::new(BandConfig::new(3, 1)).unwrap();
        agg.ingest(consistent_block(0, 2, 3)).unwrap();
        let band = agg.ingest(consistent_block(2, 2, 3)).unwrap();

        assert_eq!(band.start(), 2);
        assert_eq!(band.rows(), 4);
        assert_eq!(band.finalized(), 2);
        // time 2 was predicted by block-0 rows 0 and 1 and block-1 row 0
        assert_eq!(band.support()[[0, 0]], 3);
        assert_relative_eq!(band.median()[[0, 0]], 2.0);
        assert_relative_eq!(band.std()[[0, 0]], 0.0);
        assert_eq!(agg.origin(), 2);
    }

    #[test]
    fn median_resists_a_single_outlier_lag() {
        let horizon = 4;
        let mut agg = RollingBandAggregator::new(BandConfig::new(horizon, 1)).unwrap();
        for anchor in (0..12).step_by(3) {
            let mut values = Array3::from_elem((3, horizon, 1), 5.0);
            if anchor == 6 {
                values[[0, 0, 0]] = 1.0e6;
            }
            let band = agg
                .ingest(ForecastBlock::new(values).unwrap().with_anchor(anchor))
                .unwrap()
                .clone();
            for t in 0..band.finalized() {
                assert_relative_eq!(band.median()[[t, 0]], 5.0);
            }
        }
    }

    #[test]
    fn spread_reflects_disagreement_between_lags() {
        let mut agg = RollingBandAggregator::new(BandConfig::new(2, 1)).unwrap();
        let first = ForecastBlock::from_shape_vec((1, 2, 1), vec![1.0, 3.0]).unwrap();
        let second = ForecastBlock::from_shape_vec((1, 2, 1), vec![5.0, 0.0]).unwrap();
        agg.ingest(first).unwrap();
        let band = agg.ingest(second).unwrap();

        // time 1: lag-1 value 3.0 from the first block, lag-0 value 5.0 now
        assert_relative_eq!(band.median()[[0, 0]], 4.0);
        assert_relative_eq!(band.std()[[0, 0]], 1.0);
        // tail row only has the lag-1 value 0.0: boundary pass adds 1.0 * 1.0,
        // lead pass adds another 0.1 * 1.0
        assert_relative_eq!(band.median()[[1, 0]], 0.0);
        assert_relative_eq!(band.std()[[1, 0]], 1.1, epsilon = 1e-12);
    }

    #[test]
    fn empty_block_is_a_no_op() {
        let mut agg = RollingBandAggregator::new(BandConfig::new(3, 1)).unwrap();
        agg.ingest(consistent_block(0, 2, 3)).unwrap();
        let before_buffer = bits(&agg.buffer());
        let before_band = agg.estimate().clone();

        let band = agg.ingest(ForecastBlock::empty(3, 1)).unwrap();
        assert_eq!(band.start(), before_band.start());
        assert_eq!(bits(&agg.buffer()), before_buffer);
        assert_eq!(agg.origin(), 0);
    }

    #[test]
    fn mismatched_block_is_rejected_without_side_effects() {
        let mut agg = RollingBandAggregator::new(BandConfig::new(3, 1)).unwrap();
        let wrong = ForecastBlock::new(Array3::zeros((2, 4, 1))).unwrap();
        assert_eq!(
            agg.ingest(wrong).unwrap_err(),
            BandError::ShapeMismatch {
                axis: "horizon",
                expected: 3,
                got: 4
            }
        );
        assert_eq!(agg.buffer().dim(), (2, 3, 1));
    }

    #[test]
    fn strict_mode_rejects_stale_anchors() {
        let config = BandConfig::new(3, 1).with_strict_order(true);
        let mut agg = RollingBandAggregator::new(config).unwrap();
        agg.ingest(consistent_block(4, 2, 3)).unwrap();
        let before = bits(&agg.buffer());

        assert_eq!(
            agg.ingest(consistent_block(2, 2, 3)).unwrap_err(),
            BandError::OutOfOrderIngest {
                previous: 4,
                got: 2
            }
        );
        assert_eq!(bits(&agg.buffer()), before);

        let unanchored = ForecastBlock::new(Array3::zeros((1, 3, 1))).unwrap();
        assert_eq!(agg.ingest(unanchored).unwrap_err(), BandError::MissingAnchor);
        assert!(agg.ingest(consistent_block(6, 2, 3)).is_ok());
    }

    #[test]
    fn strict_mode_rejects_overlapping_anchors() {
        let config = BandConfig::new(3, 1).with_strict_order(true);
        let mut agg = RollingBandAggregator::new(config).unwrap();
        agg.ingest(consistent_block(0, 4, 3)).unwrap();
        let before = bits(&agg.buffer());

        assert_eq!(
            agg.ingest(consistent_block(1, 4, 3)).unwrap_err(),
            BandError::AnchorGap {
                expected: 4,
                got: 1
            }
        );
        assert_eq!(bits(&agg.buffer()), before);

        // the contiguous block keeps consistent forecasts spread-free
        let band = agg.ingest(consistent_block(4, 4, 3)).unwrap();
        assert_eq!(band.start(), 4);
        assert_relative_eq!(band.median()[[0, 0]], 4.0);
        assert_relative_eq!(band.std()[[0, 0]], 0.0);
    }

    #[test]
    fn strict_mode_rejects_gapped_anchors() {
        let config = BandConfig::new(3, 1).with_strict_order(true);
        let mut agg = RollingBandAggregator::new(config).unwrap();
        agg.ingest(consistent_block(0, 2, 3)).unwrap();

        assert_eq!(
            agg.ingest(consistent_block(10, 2, 3)).unwrap_err(),
            BandError::AnchorGap {
                expected: 2,
                got: 10
            }
        );
        assert_eq!(agg.origin(), 0);
        assert_eq!(agg.estimate().start(), 0);
    }

    #[test]
    fn strict_mode_labels_rows_from_the_first_anchor() {
        let config = BandConfig::new(3, 1).with_strict_order(true);
        let mut agg = RollingBandAggregator::new(config).unwrap();

        let band = agg.ingest(consistent_block(4, 2, 3)).unwrap();
        assert_eq!(band.start(), 4);
        assert_relative_eq!(band.median()[[0, 0]], 4.0);

        let band = agg.ingest(consistent_block(6, 2, 3)).unwrap();
        assert_eq!(band.start(), 6);
        for row in 0..band.finalized() {
            assert_relative_eq!(band.median()[[row, 0]], (band.start() + row) as f64);
        }
    }

    #[test]
    fn horizon_one_degenerates_to_the_block_itself() {
        let mut agg = RollingBandAggregator::new(BandConfig::new(1, 1)).unwrap();
        let block = ForecastBlock::from_shape_vec((3, 1, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let band = agg.ingest(block).unwrap();

        assert_eq!(band.rows(), 3);
        assert_eq!(band.median().column(0).to_vec(), vec![1.0, 2.0, 3.0]);
        assert!(band.std().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn config_deserializes_with_default_strictness() {
        let config: BandConfig =
            serde_json::from_str(r#"{"horizon": 6, "feature_dim": 2}"#).unwrap();
        assert_eq!(config, BandConfig::new(6, 2));
    }
}
