//! Score analysis.
//!
//! Pools evaluation scores per metric and derives the summary statistics.

pub mod aggregator;

pub use aggregator::*;
