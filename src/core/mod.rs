//! Core data structures shared by the aggregators.

mod band;
mod block;
mod series;

pub use band::BandEstimate;
pub use block::ForecastBlock;
pub use series::AssembledSeries;
