//! Final single-valued output series reconstructed from forecast blocks.

use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{BandError, Result};

/// One best-estimate value per absolute timestep and feature,
/// shape `(timesteps, feature_dim)`.
///
/// Timesteps that no forecast ever covered hold NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSeries {
    values: Array2<f64>,
}

impl AssembledSeries {
    pub(crate) fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// Number of absolute timesteps.
    pub fn len(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn feature_dim(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Values of one feature across all timesteps.
    pub fn column(&self, feature: usize) -> Result<ArrayView1<'_, f64>> {
        if feature >= self.feature_dim() {
            return Err(BandError::IndexOutOfBounds {
                index: feature,
                size: self.feature_dim(),
            });
        }
        Ok(self.values.column(feature))
    }

    /// Values of the first feature.
    pub fn primary(&self) -> Vec<f64> {
        self.column(0).map(|c| c.to_vec()).unwrap_or_default()
    }

    /// Zip externally supplied timestamps with one feature column, giving
    /// the `(time, value)` rows of a two-column output table.
    pub fn with_timestamps(
        &self,
        timestamps: &[DateTime<Utc>],
        feature: usize,
    ) -> Result<Vec<(DateTime<Utc>, f64)>> {
        let column = self.column(feature)?;
        if timestamps.len() != column.len() {
            return Err(BandError::DimensionMismatch {
                expected: vec![column.len()],
                got: vec![timestamps.len()],
            });
        }
        Ok(timestamps.iter().copied().zip(column.iter().copied()).collect())
    }
}
