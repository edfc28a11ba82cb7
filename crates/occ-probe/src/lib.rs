//! # occ-probe
//!
//! Deadline-bounded execution of the GPU probe executables and extraction
//! of their stdout facts.
//!
//! Provides the platform-selected [`BoundedRunner`] implementations, the
//! marker-based output extractor, the [`ProbeExecutor`] that composes them,
//! and the startup device query.

mod device;
mod extract;
mod probe;
mod runner;

pub use device::{parse_device_report, query_device};
pub use extract::{
    extract_float, extract_integer, APP_RUNTIME_MARKER, GROUPS_MARKER, KERNEL_TIME_EQ_MARKER,
    KERNEL_TIME_MARKER, PARTICIPATING_GROUPS_MARKER,
};
pub use probe::{DisciplineTrialProbe, FrontierProbe, ProbeExecutor, TuningTrialProbe};
pub use runner::{default_runner, BoundedRunner, PollRunner, RunResult};

#[cfg(unix)]
pub use runner::SignalRunner;
