//! Trait seams between the pure pipeline stages and their collaborators.

pub mod indicator;

pub use indicator::{value_at, Indicator};
