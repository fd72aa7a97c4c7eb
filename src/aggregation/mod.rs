//! Aggregators that fold overlapping forecast blocks.
//!
//! - [`RollingBandAggregator`]: streaming median/std band over a short
//!   rolling window.
//! - [`SequentialAssembler`]: batch reconstruction of one value per timestep.
//!
//! Both expect blocks in strict anchor-time order and keep all of their state
//! in the instance; use one instance per sequence.

pub mod assembler;
pub mod decay;
mod order;
mod ring;
pub mod rolling;

pub use assembler::{AssemblerConfig, SequentialAssembler};
pub use decay::LEAD_DECAY;
pub use rolling::{BandConfig, RollingBandAggregator};

use crate::error::{BandError, Result};

fn validate_window(horizon: usize, feature_dim: usize) -> Result<()> {
    if horizon == 0 {
        return Err(BandError::InvalidParameter(
            "horizon must be at least 1".to_string(),
        ));
    }
    if feature_dim == 0 {
        return Err(BandError::InvalidParameter(
            "feature_dim must be at least 1".to_string(),
        ));
    }
    Ok(())
}
