//! Edge corrections for the rolling band's standard deviation.
//!
//! Rows near either end of the rolling window are covered by fewer lag
//! slots, so their raw spread understates the uncertainty. Two passes carry
//! spread forward from neighbouring rows:
//!
//! * boundary pass over the last `horizon - 1` rows, oldest first, with
//!   `std[n-f] += std[n-f-1] * (horizon - f) / (horizon - 1)` for
//!   `f = horizon-1, ..., 1`;
//! * lead pass over rows `1..horizon`, with `std[f] += std[f-1] * 0.1`.
//!
//! Both passes are cumulative: each row adds the already-corrected value of
//! its predecessor. The formulas are fixed and must not be unified.

use ndarray::Array2;

/// Fixed rate of the lead pass.
pub const LEAD_DECAY: f64 = 0.1;

/// Weight of the boundary pass at tail offset `offset` (`1..horizon`).
pub fn boundary_gamma(horizon: usize, offset: usize) -> f64 {
    (horizon - offset) as f64 / (horizon - 1) as f64
}

/// Boundary pass over the tail of `std` (rows × features).
pub fn apply_boundary_decay(std: &mut Array2<f64>, horizon: usize) {
    let rows = std.nrows();
    for offset in (1..horizon).rev() {
        if offset + 1 > rows {
            continue;
        }
        let gamma = boundary_gamma(horizon, offset);
        tracing::trace!(row = rows - offset, gamma, "boundary decay");
        let previous = std.row(rows - offset - 1).to_owned();
        std.row_mut(rows - offset).scaled_add(gamma, &previous);
    }
}

/// Lead pass over the head of `std` (rows × features).
pub fn apply_lead_decay(std: &mut Array2<f64>, horizon: usize) {
    let rows = std.nrows();
    for f in 1..horizon.min(rows) {
        tracing::trace!(row = f, rate = LEAD_DECAY, "lead decay");
        let previous = std.row(f - 1).to_owned();
        std.row_mut(f).scaled_add(LEAD_DECAY, &previous);
    }
}

/// Boundary pass followed by lead pass.
pub fn apply_decay(std: &mut Array2<f64>, horizon: usize) {
    apply_boundary_decay(std, horizon);
    apply_lead_decay(std, horizon);
}
