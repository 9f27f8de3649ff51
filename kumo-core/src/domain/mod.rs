//! Domain types for Kumo

pub mod candle;
pub mod interval;
pub mod position;

pub use candle::{Candle, CandleSeries, SeriesError};
pub use interval::Interval;
pub use position::{Action, PositionState};
