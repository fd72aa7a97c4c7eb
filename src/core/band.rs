//! Band estimate: per-timestep point estimate plus uncertainty width.

use ndarray::{Array2, ArrayView1, Axis};

/// Median and decay-corrected standard deviation for a run of consecutive
/// timesteps, shape `(rows, feature_dim)`.
///
/// Rows whose `support` is zero have never received a forecast; their
/// median and std are NaN and mean "not yet determined", not a value.
#[derive(Debug, Clone, PartialEq)]
pub struct BandEstimate {
    start: usize,
    finalized: usize,
    median: Array2<f64>,
    std: Array2<f64>,
    support: Array2<usize>,
}

impl BandEstimate {
    /// Estimate before any forecast has been ingested: NaN median, zero std.
    pub(crate) fn undetermined(rows: usize, feature_dim: usize) -> Self {
        Self {
            start: 0,
            finalized: 0,
            median: Array2::from_elem((rows, feature_dim), f64::NAN),
            std: Array2::zeros((rows, feature_dim)),
            support: Array2::zeros((rows, feature_dim)),
        }
    }

    pub(crate) fn new(
        start: usize,
        finalized: usize,
        median: Array2<f64>,
        std: Array2<f64>,
        support: Array2<usize>,
    ) -> Self {
        debug_assert_eq!(median.dim(), std.dim());
        debug_assert_eq!(median.dim(), support.dim());
        Self {
            start,
            finalized,
            median,
            std,
            support,
        }
    }

    /// Absolute time index of row 0.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of leading rows that no later forecast block can touch.
    pub fn finalized(&self) -> usize {
        self.finalized
    }

    pub fn rows(&self) -> usize {
        self.median.len_of(Axis(0))
    }

    pub fn feature_dim(&self) -> usize {
        self.median.len_of(Axis(1))
    }

    pub fn median(&self) -> &Array2<f64> {
        &self.median
    }

    pub fn std(&self) -> &Array2<f64> {
        &self.std
    }

    /// Number of lag slots that contributed to each cell.
    pub fn support(&self) -> &Array2<usize> {
        &self.support
    }

    /// Median of one row across features.
    pub fn median_at(&self, row: usize) -> ArrayView1<'_, f64> {
        self.median.row(row)
    }

    /// Std of one row across features.
    pub fn std_at(&self, row: usize) -> ArrayView1<'_, f64> {
        self.std.row(row)
    }

    /// True when every feature of `row` has at least one contributing forecast.
    pub fn is_determined(&self, row: usize) -> bool {
        row < self.rows() && self.support.row(row).iter().all(|&n| n > 0)
    }

    /// Lower band edge `median - width * std`.
    pub fn lower(&self, width: f64) -> Array2<f64> {
        &self.median - &(&self.std * width)
    }

    /// Upper band edge `median + width * std`.
    pub fn upper(&self, width: f64) -> Array2<f64> {
        &self.median + &(&self.std * width)
    }
}
