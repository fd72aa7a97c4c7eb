//! Strict-mode anchor ordering check.
//!
//! Both aggregators place block rows at their own time cursor, so an anchor
//! is only valid if it equals the previous anchor plus the previous batch
//! size. Stale anchors are `OutOfOrderIngest`; overlaps and gaps are
//! `AnchorGap`.

use crate::core::ForecastBlock;
use crate::error::{BandError, Result};

/// Rejects blocks whose anchor does not continue the accepted stream.
#[derive(Debug, Clone, Default)]
pub(crate) struct OrderGuard {
    last: Option<usize>,
    expected: Option<usize>,
}

impl OrderGuard {
    /// True until the first block has been accepted.
    pub(crate) fn is_fresh(&self) -> bool {
        self.last.is_none()
    }

    /// Validate `block` against the accepted stream without recording it.
    pub(crate) fn check(&self, block: &ForecastBlock) -> Result<usize> {
        let anchor = block.anchor().ok_or(BandError::MissingAnchor)?;
        if let Some(previous) = self.last {
            if anchor <= previous {
                tracing::warn!(previous, anchor, "forecast block arrived out of order");
                return Err(BandError::OutOfOrderIngest {
                    previous,
                    got: anchor,
                });
            }
        }
        match self.expected {
            Some(expected) if anchor != expected => {
                tracing::warn!(expected, anchor, "forecast block is not contiguous");
                Err(BandError::AnchorGap {
                    expected,
                    got: anchor,
                })
            }
            _ => Ok(anchor),
        }
    }

    pub(crate) fn accept(&mut self, anchor: usize, batch_size: usize) {
        self.last = Some(anchor);
        self.expected = Some(anchor + batch_size);
    }
}
