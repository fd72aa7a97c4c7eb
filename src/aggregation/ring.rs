//! Fixed-capacity ring of `(horizon, feature_dim)` lag rows.
//!
//! Logical row `i` lives at physical row `(head + i) % capacity`. Dropping
//! old rows only moves `head`, so the sliding window never reallocates once
//! the capacity covers `horizon - 1 + batch_size`.

use ndarray::{s, Array3, ArrayView1, ArrayView2, ArrayViewMut1, Axis};

#[derive(Debug, Clone)]
pub(crate) struct LagRing {
    data: Array3<f64>,
    head: usize,
    len: usize,
}

impl LagRing {
    /// Ring holding `rows` all-NaN rows.
    pub(crate) fn filled_nan(rows: usize, horizon: usize, feature_dim: usize) -> Self {
        Self {
            data: Array3::from_elem((rows, horizon, feature_dim), f64::NAN),
            head: 0,
            len: rows,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    fn physical(&self, row: usize) -> usize {
        debug_assert!(row < self.len);
        (self.head + row) % self.capacity()
    }

    /// Drop the oldest rows so that at most `keep` remain. Returns the
    /// number of rows dropped.
    pub(crate) fn retain_last(&mut self, keep: usize) -> usize {
        if self.len <= keep {
            return 0;
        }
        let dropped = self.len - keep;
        self.head = (self.head + dropped) % self.capacity();
        self.len = keep;
        dropped
    }

    /// Append `rows` all-NaN rows at the back, growing the capacity if needed.
    pub(crate) fn push_nan_rows(&mut self, rows: usize) {
        self.reserve(rows);
        for i in 0..rows {
            let at = (self.head + self.len + i) % self.capacity();
            self.data.index_axis_mut(Axis(0), at).fill(f64::NAN);
        }
        self.len += rows;
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.len + additional;
        if needed <= self.capacity() {
            return;
        }
        let (_, horizon, feature_dim) = self.data.dim();
        let mut grown = Array3::from_elem((needed, horizon, feature_dim), f64::NAN);
        for row in 0..self.len {
            grown
                .index_axis_mut(Axis(0), row)
                .assign(&self.data.index_axis(Axis(0), self.physical(row)));
        }
        tracing::trace!(from = self.capacity(), to = needed, "lag ring grown");
        self.data = grown;
        self.head = 0;
    }

    /// The `(horizon, feature_dim)` lag row at logical index `row`.
    pub(crate) fn row(&self, row: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), self.physical(row))
    }

    /// All lag values of one feature at logical index `row`.
    pub(crate) fn lane(&self, row: usize, feature: usize) -> ArrayView1<'_, f64> {
        self.data.slice(s![self.physical(row), .., feature])
    }

    /// Feature vector at `(row, lag)`.
    pub(crate) fn slot_mut(&mut self, row: usize, lag: usize) -> ArrayViewMut1<'_, f64> {
        let at = self.physical(row);
        self.data.slice_mut(s![at, lag, ..])
    }

    /// Copy out the logical contents, oldest row first.
    pub(crate) fn to_array(&self) -> Array3<f64> {
        let (_, horizon, feature_dim) = self.data.dim();
        let mut out = Array3::from_elem((self.len, horizon, feature_dim), f64::NAN);
        for row in 0..self.len {
            out.index_axis_mut(Axis(0), row).assign(&self.row(row));
        }
        out
    }
}
