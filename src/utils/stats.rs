//! NaN-ignoring statistical reductions.
//!
//! NaN marks an absent value throughout the crate, so every reduction here
//! skips NaN entries instead of propagating them. A reduction over nothing
//! (empty input or all NaN) yields NaN.

use std::cmp::Ordering;

/// Collect the non-NaN values of an iterator.
pub fn present<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().filter(|v| !v.is_nan()).collect()
}

/// Number of non-NaN values.
pub fn nan_count<I>(values: I) -> usize
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().filter(|v| !v.is_nan()).count()
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n, not n-1).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Mean over the non-NaN values.
pub fn nan_mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    mean(&present(values))
}

/// Median over the non-NaN values.
pub fn nan_median<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    median(&present(values))
}

/// Population standard deviation over the non-NaN values.
pub fn nan_std<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    population_std(&present(values))
}
