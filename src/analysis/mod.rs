//! Analysis modules.
//!
//! Aggregation of the recorded datasets into report statistics.

pub mod aggregator;

pub use aggregator::*;
