//! # occ-search
//!
//! The measurement core of the occupancy harness: the timeout-driven
//! frontier search over concurrency levels, and the repeated-trial
//! aggregator that turns probe runs into summary statistics.
//!
//! Both operate through the probe seams in `occ-types`, so they are tested
//! against synthetic probes and driven against real processes by
//! `occ-probe` adapters.

mod aggregate;
mod frontier;
mod stats;

pub use aggregate::{AggregateOutcome, TrialAggregator};
pub use frontier::find_frontier;
pub use stats::summarize;
