//! Masked accuracy metrics for forecast monitoring.
//!
//! Scores compare ground truth against predictions at the positions a mask
//! marks as scorable (`mask == 0`; any other value excludes the position,
//! e.g. originally missing or imputed ground truth):
//!
//! - NME  = mean((true - pred) / (epsilon + true))
//! - NMAE = mean(|(true - pred) / (epsilon + true)|)
//! - RMSE = sqrt(mean((true - pred)^2))
//!
//! NME and NMAE additionally skip positions whose true value is exactly zero.
//! A metric with nothing left to average is NaN for that call and is not
//! added to the running sums.
//!
//! Running sums live in a caller-owned [`MetricState`], reset between
//! evaluation epochs.

use std::fmt;

use ndarray::{AsArray, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::{BandError, Result};
use crate::utils::stats::mean;

/// Default stabilizer added to the true value in normalized errors.
pub const DEFAULT_EPSILON: f64 = 1e-7;

/// Configuration for [`MaskedMetricEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Added to the denominator of NME/NMAE.
    pub epsilon: f64,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl MetricConfig {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Metrics of a single scoring call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricScores {
    pub nme: f64,
    pub nmae: f64,
    pub rmse: f64,
}

impl MetricScores {
    /// True when at least one metric had nothing to average.
    pub fn is_degenerate(&self) -> bool {
        self.nme.is_nan() || self.nmae.is_nan() || self.rmse.is_nan()
    }
}

/// Running sums accumulated over an evaluation epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricState {
    nme_sum: f64,
    nmae_sum: f64,
    rmse_sum: f64,
    batches: usize,
    degenerate: usize,
}

impl MetricState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every running sum and counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn nme_sum(&self) -> f64 {
        self.nme_sum
    }

    pub fn nmae_sum(&self) -> f64 {
        self.nmae_sum
    }

    pub fn rmse_sum(&self) -> f64 {
        self.rmse_sum
    }

    /// Number of scoring calls since the last reset.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Number of scoring calls that produced at least one NaN metric.
    pub fn degenerate(&self) -> usize {
        self.degenerate
    }

    fn accumulate(&mut self, scores: &MetricScores) {
        fn add(sum: &mut f64, value: f64) {
            if !value.is_nan() {
                *sum += value;
            }
        }
        add(&mut self.nme_sum, scores.nme);
        add(&mut self.nmae_sum, scores.nmae);
        add(&mut self.rmse_sum, scores.rmse);
        self.batches += 1;
        if scores.is_degenerate() {
            self.degenerate += 1;
        }
    }
}

/// Averaged metrics over a number of batches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricReport {
    pub nme: f64,
    pub nmae: f64,
    pub rmse: f64,
}

impl fmt::Display for MetricReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NME {:6.3} | NMAE {:7.5} | RMSE {:6.3}",
            self.nme, self.nmae, self.rmse
        )
    }
}

/// Scores predictions against masked ground truth.
#[derive(Debug, Clone, Default)]
pub struct MaskedMetricEngine {
    config: MetricConfig,
}

impl MaskedMetricEngine {
    pub fn new(config: MetricConfig) -> Result<Self> {
        if !(config.epsilon.is_finite() && config.epsilon > 0.0) {
            return Err(BandError::InvalidParameter(format!(
                "epsilon must be finite and positive, got {}",
                config.epsilon
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// Start a new evaluation epoch.
    pub fn reset(&self, state: &mut MetricState) {
        tracing::debug!(batches = state.batches(), "metric state reset");
        state.reset();
    }

    /// Score one batch and add its metrics to `state`.
    ///
    /// `actual`, `predicted` and `mask` must share one shape.
    pub fn score<'a, D, A, P, M>(
        &self,
        state: &mut MetricState,
        actual: A,
        predicted: P,
        mask: M,
    ) -> Result<MetricScores>
    where
        D: Dimension,
        A: AsArray<'a, f64, D>,
        P: AsArray<'a, f64, D>,
        M: AsArray<'a, f64, D>,
    {
        let actual = actual.into();
        let predicted = predicted.into();
        let mask = mask.into();
        for other in [predicted.shape(), mask.shape()] {
            if other != actual.shape() {
                return Err(BandError::DimensionMismatch {
                    expected: actual.shape().to_vec(),
                    got: other.to_vec(),
                });
            }
        }

        let scored: Vec<(f64, f64)> = actual
            .iter()
            .zip(predicted.iter())
            .zip(mask.iter())
            .filter(|&(_, &m)| m == 0.0)
            .map(|((&t, &p), _)| (t, p))
            .collect();

        let squared: Vec<f64> = scored.iter().map(|(t, p)| (t - p).powi(2)).collect();
        let rmse = mean(&squared).sqrt();

        let normalized: Vec<f64> = scored
            .iter()
            .filter(|(t, _)| *t != 0.0)
            .map(|(t, p)| (t - p) / (self.config.epsilon + t))
            .collect();
        let nme = mean(&normalized);
        let absolute: Vec<f64> = normalized.iter().map(|e| e.abs()).collect();
        let nmae = mean(&absolute);

        let scores = MetricScores { nme, nmae, rmse };
        if scores.is_degenerate() {
            tracing::warn!(
                scored = scored.len(),
                normalizable = normalized.len(),
                "metric set degenerate; NaN metrics left out of running sums"
            );
        }
        state.accumulate(&scores);
        Ok(scores)
    }

    /// Running sums divided by `batch_count`.
    pub fn report(&self, state: &MetricState, batch_count: usize) -> Result<MetricReport> {
        if batch_count == 0 {
            return Err(BandError::InvalidParameter(
                "batch_count must be at least 1".to_string(),
            ));
        }
        let n = batch_count as f64;
        Ok(MetricReport {
            nme: state.nme_sum / n,
            nmae: state.nmae_sum / n,
            rmse: state.rmse_sum / n,
        })
    }
}
