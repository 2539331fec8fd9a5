//! Reviews left by swap participants

mod aggregator;

pub use aggregator::{ReviewAggregator, MAX_RATING, MIN_RATING};
