//! # occ-sweep
//!
//! The sweep drivers: enumerate configuration cells, drive the frontier
//! search and trial aggregation for each, and write the report files.
//!
//! Three sweeps are provided, matching the three probe suites:
//! [`run_occupancy_sweep`], [`run_timing_sweep`] and [`run_tuning_sweep`].

pub mod occupancy;
pub mod timing;
pub mod tuning;
pub mod write;

pub use occupancy::{all_cells, run_occupancy_cells, run_occupancy_sweep, OCCUPANCY_PROBE};
pub use timing::{run_timing_sweep, timing_sizes, TIMING_PROBE};
pub use tuning::{
    candidate_sizes, run_tuning_sweep, TuningSuite, LONESTAR_PROGRAMS, PANNOTIA_PROGRAMS,
};
pub use write::{report_stem, write_occupancy_report, write_timing_report, write_tuning_report};

/// Name of the device-query probe executable.
pub const DEVICE_QUERY_PROBE: &str = "device_query";
