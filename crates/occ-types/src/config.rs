//! Run-wide harness configuration.
//!
//! Everything that applies to a whole run (executable paths, chip name,
//! iteration counts, deadlines, output directory) lives here as one
//! explicit object, constructed once by the CLI and passed by reference
//! into each component.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default per-probe deadline for frontier search steps.
pub const DEFAULT_SEARCH_DEADLINE: Duration = Duration::from_secs(7);

/// Default upper bound of the frontier search range.
pub const DEFAULT_SEARCH_HIGH: u32 = 512;

/// Default attempts per trial before a configuration is declared failed.
pub const DEFAULT_RETRY_CAP: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Directory holding the probe executables.
    pub probe_dir: PathBuf,
    /// Directory holding benchmark datasets (tuning sweep only).
    pub data_dir: Option<PathBuf>,
    pub run_name: String,
    /// Override for the device name in report files; defaults to the
    /// queried device name.
    pub chip_name: Option<String>,
    /// Trials per configuration.
    pub iterations: usize,
    /// Wall-clock deadline per frontier probe.
    pub search_deadline: Duration,
    /// Deadline for discovery/timing/tuning runs at feasible levels.
    /// These never legitimately hang, so it is generous.
    pub trial_deadline: Duration,
    /// Inclusive upper bound of the frontier search range.
    pub search_high: u32,
    /// Attempts per trial before ConfigurationFailure.
    pub retry_cap: usize,
    /// Opt-in: skip failed configurations instead of aborting the sweep.
    pub keep_going: bool,
    pub output_dir: PathBuf,
}

impl HarnessConfig {
    pub fn new(probe_dir: impl Into<PathBuf>, run_name: impl Into<String>) -> Self {
        Self {
            probe_dir: probe_dir.into(),
            data_dir: None,
            run_name: run_name.into(),
            chip_name: None,
            iterations: 10,
            search_deadline: DEFAULT_SEARCH_DEADLINE,
            trial_deadline: Duration::from_secs(120),
            search_high: DEFAULT_SEARCH_HIGH,
            retry_cap: DEFAULT_RETRY_CAP,
            keep_going: false,
            output_dir: PathBuf::from("."),
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_retry_cap(mut self, retry_cap: usize) -> Self {
        self.retry_cap = retry_cap;
        self
    }

    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn probe_path(&self, name: &str) -> PathBuf {
        self.probe_dir.join(name)
    }
}
