//! Forecast block: one batch of multi-step-ahead model output.

use ndarray::{Array3, ArrayView2, ArrayView3, Axis};

use crate::error::{BandError, Result};

/// One unit of model output with shape `(batch_size, horizon, feature_dim)`.
///
/// Row `b`, column `h` holds the prediction for timestep `anchor + b + h`,
/// made `h + 1` steps ahead. Values are finite or NaN, never infinite.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBlock {
    values: Array3<f64>,
    anchor: Option<usize>,
}

impl ForecastBlock {
    /// Wrap a `(batch_size, horizon, feature_dim)` array.
    pub fn new(values: Array3<f64>) -> Result<Self> {
        if let Some(((batch, lag, feature), _)) =
            values.indexed_iter().find(|(_, v)| v.is_infinite())
        {
            return Err(BandError::InfiniteValue {
                batch,
                lag,
                feature,
            });
        }
        Ok(Self {
            values,
            anchor: None,
        })
    }

    /// Build a block from row-major values.
    pub fn from_shape_vec(shape: (usize, usize, usize), values: Vec<f64>) -> Result<Self> {
        let expected = shape.0 * shape.1 * shape.2;
        let got = values.len();
        let values =
            Array3::from_shape_vec(shape, values).map_err(|_| BandError::DimensionMismatch {
                expected: vec![expected],
                got: vec![got],
            })?;
        Self::new(values)
    }

    /// A block with no rows for the given horizon and feature count.
    pub fn empty(horizon: usize, feature_dim: usize) -> Self {
        Self {
            values: Array3::zeros((0, horizon, feature_dim)),
            anchor: None,
        }
    }

    /// Tag the block with the absolute time index of its first row.
    pub fn with_anchor(mut self, anchor: usize) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Absolute time index of row 0, if known.
    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    pub fn batch_size(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    pub fn horizon(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    pub fn feature_dim(&self) -> usize {
        self.values.len_of(Axis(2))
    }

    pub fn is_empty(&self) -> bool {
        self.batch_size() == 0
    }

    /// All predictions made `lag + 1` steps ahead: `block[:, lag, :]`.
    ///
    /// # Panics
    /// Panics if `lag >= horizon`.
    pub fn lag(&self, lag: usize) -> ArrayView2<'_, f64> {
        self.values.index_axis(Axis(1), lag)
    }

    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.values.view()
    }

    pub fn into_inner(self) -> Array3<f64> {
        self.values
    }

    /// Reject a block whose horizon or feature axis disagrees with the
    /// shape an aggregator was built for.
    pub(crate) fn check_shape(&self, horizon: usize, feature_dim: usize) -> Result<()> {
        if self.horizon() != horizon {
            return Err(BandError::ShapeMismatch {
                axis: "horizon",
                expected: horizon,
                got: self.horizon(),
            });
        }
        if self.feature_dim() != feature_dim {
            return Err(BandError::ShapeMismatch {
                axis: "feature",
                expected: feature_dim,
                got: self.feature_dim(),
            });
        }
        Ok(())
    }
}
