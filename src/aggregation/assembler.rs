//! Batch reassembly of a single output series from overlapping forecasts.
//!
//! Every block is written diagonally into a growing buffer of shape
//! `(timesteps, horizon, feature_dim)`, so cell `(t, f, :)` holds the
//! prediction made `f + 1` steps ahead for absolute time `t`. Unwritten
//! cells hold the sentinel zero. [`SequentialAssembler::finalize`] turns
//! every exact zero into NaN and averages the remaining lag values of each
//! timestep.
//!
//! A prediction that is genuinely `0.0` cannot be told apart from an
//! unwritten cell and is dropped from the average. The validity bitmap kept
//! alongside the buffer counts such drops but does not change the result.

use std::collections::VecDeque;

use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use super::order::OrderGuard;
use super::validate_window;
use crate::core::{AssembledSeries, ForecastBlock};
use crate::error::{BandError, Result};
use crate::utils::stats::nan_mean;

/// Configuration for [`SequentialAssembler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Number of future steps each block predicts.
    pub horizon: usize,
    /// Number of target features.
    pub feature_dim: usize,
    /// Reject blocks whose anchor does not continue the previous block.
    #[serde(default)]
    pub strict_order: bool,
}

impl AssemblerConfig {
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

/// Accumulates forecast blocks and collapses them into one value per timestep.
#[derive(Debug, Clone)]
pub struct SequentialAssembler {
    config: AssemblerConfig,
    values: Array3<f64>,
    written: Array3<bool>,
    next_time: usize,
    recent: VecDeque<Array2<f64>>,
    overwrites: usize,
    guard: Option<OrderGuard>,
}

impl SequentialAssembler {
    pub fn new(config: AssemblerConfig) -> Result<Self> {
        validate_window(config.horizon, config.feature_dim)?;
        let shape = (0, config.horizon, config.feature_dim);
        Ok(Self {
            values: Array3::zeros(shape),
            written: Array3::from_elem(shape, false),
            next_time: 0,
            recent: VecDeque::new(),
            overwrites: 0,
            guard: config.strict_order.then(OrderGuard::default),
            config,
        })
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Next absolute time row a block's first prediction will land on.
    pub fn next_time(&self) -> usize {
        self.next_time
    }

    /// Number of time rows allocated so far.
    pub fn timesteps(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    /// The raw buffer, zero where nothing was written.
    pub fn buffer(&self) -> ArrayView3<'_, f64> {
        self.values.view()
    }

    /// Cells that received a prediction.
    pub fn written_count(&self) -> usize {
        self.written.iter().filter(|&&w| w).count()
    }

    /// Cells still holding the unwritten sentinel.
    pub fn unwritten_count(&self) -> usize {
        self.written.len() - self.written_count()
    }

    /// Written cells whose prediction was exactly zero and will therefore
    /// be treated as unwritten by [`finalize`](Self::finalize).
    pub fn dropped_zero_count(&self) -> usize {
        self.values
            .iter()
            .zip(self.written.iter())
            .filter(|&(&v, &w)| w && v == 0.0)
            .count()
    }

    /// Number of diagonal writes that landed on an already written cell.
    pub fn overwrite_count(&self) -> usize {
        self.overwrites
    }

    /// Most recent raw block rows, oldest first, each `(horizon, feature_dim)`.
    /// Holds at most `batch_size + horizon` rows of the latest block size.
    pub fn recent_predictions(&self) -> impl Iterator<Item = ArrayView2<'_, f64>> {
        self.recent.iter().map(|row| row.view())
    }

    /// Append one forecast block.
    pub fn ingest(&mut self, block: ForecastBlock) -> Result<()> {
        block.check_shape(self.config.horizon, self.config.feature_dim)?;
        if block.is_empty() {
            return Ok(());
        }
        let anchor = match &self.guard {
            Some(guard) => Some(guard.check(&block)?),
            None => None,
        };

        let horizon = self.config.horizon;
        let batch_size = block.batch_size();

        self.grow_to(self.next_time + batch_size + horizon - 1)?;

        for lag in 0..horizon {
            let rows = self.next_time + lag..self.next_time + lag + batch_size;
            let mut written = self.written.slice_mut(s![rows.clone(), lag, ..]);
            let occupied = written.iter().filter(|&&w| w).count();
            if occupied > 0 {
                tracing::warn!(lag, occupied, "diagonal write overwrote assembled cells");
                self.overwrites += occupied;
            }
            written.fill(true);
            self.values
                .slice_mut(s![rows, lag, ..])
                .assign(&block.lag(lag));
        }
        self.next_time += batch_size;

        for row in block.view().outer_iter() {
            self.recent.push_back(row.to_owned());
        }
        while self.recent.len() > batch_size + horizon {
            self.recent.pop_front();
        }

        if let (Some(guard), Some(anchor)) = (self.guard.as_mut(), anchor) {
            guard.accept(anchor, batch_size);
        }

        tracing::debug!(
            next_time = self.next_time,
            timesteps = self.timesteps(),
            batch_size,
            "forecast block appended to assembly buffer"
        );
        Ok(())
    }

    fn grow_to(&mut self, rows: usize) -> Result<()> {
        let current = self.timesteps();
        if rows <= current {
            return Ok(());
        }
        let extra = (rows - current, self.config.horizon, self.config.feature_dim);
        self.values
            .append(Axis(0), Array3::zeros(extra).view())
            .map_err(|_| BandError::DimensionMismatch {
                expected: self.values.shape().to_vec(),
                got: vec![extra.0, extra.1, extra.2],
            })?;
        self.written
            .append(Axis(0), Array3::from_elem(extra, false).view())
            .map_err(|_| BandError::DimensionMismatch {
                expected: self.written.shape().to_vec(),
                got: vec![extra.0, extra.1, extra.2],
            })?;
        Ok(())
    }

    /// Collapse the lag axis into one value per timestep and feature.
    ///
    /// Exact zeros are read as unwritten and skipped; a timestep with no
    /// remaining values is NaN.
    pub fn finalize(&self) -> AssembledSeries {
        let dropped = self.dropped_zero_count();
        if dropped > 0 {
            tracing::debug!(dropped, "zero-valued predictions read as unwritten");
        }
        let values = self.values.map_axis(Axis(1), |lane| {
            nan_mean(
                lane.iter()
                    .map(|&v| if v == 0.0 { f64::NAN } else { v }),
            )
        });
        tracing::debug!(
            timesteps = values.nrows(),
            features = values.ncols(),
            "assembled output series"
        );
        AssembledSeries::new(values)
    }
}
