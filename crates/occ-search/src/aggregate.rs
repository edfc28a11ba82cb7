//! Repeated-trial aggregation.
//!
//! Runs one probe configuration a fixed number of times and reduces the
//! per-trial observations to summary statistics. The aggregator always runs
//! at a concurrency level already established as feasible, so a timeout
//! here is treated like malformed output: a transient fault worth retrying,
//! not a measurement. Retries are bounded; a configuration that cannot
//! produce a well-formed sample within the cap fails outright instead of
//! spinning forever against a broken device.

use occ_types::{HarnessResult, ProbeOutcome, SweepError, TrialProbe, TrialSample};
use tracing::{debug, warn};

use crate::stats::summarize;

/// Aggregated result for one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome {
    /// Occupancy statistics, when the probe reports workgroup counts.
    pub occupancy: Option<occ_types::Summary>,
    /// Kernel-time statistics, when the probe reports times.
    pub kernel_time: Option<occ_types::Summary>,
    /// Per-trial observations in execution order.
    pub samples: Vec<TrialSample>,
}

impl AggregateOutcome {
    /// Largest observed workgroup count, used as the ticket-protocol
    /// occupancy pre-estimate in the timing sweep.
    pub fn max_groups(&self) -> Option<u64> {
        self.samples.iter().filter_map(|s| s.groups).max()
    }
}

/// Runs N trials of a configuration with bounded per-trial retry.
#[derive(Debug, Clone, Copy)]
pub struct TrialAggregator {
    iterations: usize,
    retry_cap: usize,
}

impl TrialAggregator {
    pub fn new(iterations: usize, retry_cap: usize) -> Self {
        Self {
            iterations,
            retry_cap: retry_cap.max(1),
        }
    }

    /// Execute all configured trials and summarize them.
    ///
    /// Every configured iteration runs; a sweep is only as comparable as
    /// its per-configuration sample counts.
    pub fn aggregate(&self, probe: &mut dyn TrialProbe) -> HarnessResult<AggregateOutcome> {
        let mut samples = Vec::with_capacity(self.iterations);
        for trial in 0..self.iterations {
            let sample = self.run_one(probe, trial)?;
            if let Some(groups) = sample.groups {
                debug!(trial, groups, "trial complete");
            }
            samples.push(sample);
        }

        let groups: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.groups.map(|g| g as f64))
            .collect();
        let times: Vec<f64> = samples.iter().filter_map(|s| s.elapsed_seconds).collect();

        Ok(AggregateOutcome {
            occupancy: summarize(&groups),
            kernel_time: summarize(&times),
            samples,
        })
    }

    /// One trial, re-invoking the probe on transient failure up to the cap.
    fn run_one(&self, probe: &mut dyn TrialProbe, trial: usize) -> HarnessResult<TrialSample> {
        let mut last_reason = String::new();
        for attempt in 1..=self.retry_cap {
            match probe.run_trial()? {
                ProbeOutcome::Completed {
                    groups,
                    elapsed_seconds,
                } => {
                    return Ok(TrialSample {
                        groups,
                        elapsed_seconds,
                    })
                }
                ProbeOutcome::TimedOut => {
                    warn!(trial, attempt, "trial timed out at a feasible level, retrying");
                    last_reason = "timed out at a feasible concurrency level".to_string();
                }
                ProbeOutcome::Malformed { raw, reason } => {
                    warn!(trial, attempt, %reason, stdout = %raw, "malformed probe output, retrying");
                    last_reason = reason;
                }
            }
        }
        Err(SweepError::ConfigurationFailure {
            configuration: probe.describe(),
            attempts: self.retry_cap,
            reason: last_reason,
        }
        .into())
    }
}
