//! Probe configurations and per-execution outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::HarnessResult;

/// Whether a probe at some concurrency level completed within its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feasibility {
    Feasible,
    Infeasible,
}

impl Feasibility {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Feasible)
    }
}

/// Synchronization discipline used by the discovery protocol probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockDiscipline {
    Spin,
    Ticket,
}

impl LockDiscipline {
    /// Positional flag value understood by the probe executables.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Spin => "0",
            Self::Ticket => "1",
        }
    }

    pub const ALL: [LockDiscipline; 2] = [LockDiscipline::Spin, LockDiscipline::Ticket];
}

impl fmt::Display for LockDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spin => write!(f, "spin"),
            Self::Ticket => write!(f, "ticket"),
        }
    }
}

/// One fully-specified invocation of an occupancy or timing probe.
///
/// Constructed per search step or per trial; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfiguration {
    pub executable: PathBuf,
    /// Number of workgroups the probe launches (the concurrency level under
    /// test during frontier search, or the fixed oversubscribed launch size
    /// during discovery runs).
    pub groups: u32,
    pub workgroup_size: u32,
    pub local_mem_bytes: u64,
    /// Whether the probe runs the occupancy-discovery protocol or a plain
    /// bounded launch.
    pub discovery: bool,
    pub discipline: LockDiscipline,
    /// Timing probes take no discovery flag and report a kernel time.
    pub timed: bool,
}

/// Launch size used for discovery runs: deliberately far more workgroups
/// than any device sustains concurrently, so the protocol discovers the
/// true resident count.
pub const DISCOVERY_LAUNCH_GROUPS: u32 = 1000;

impl ProbeConfiguration {
    /// A frontier-search step: plain launch of `groups` workgroups with the
    /// discovery protocol disabled.
    pub fn frontier_step(
        executable: impl Into<PathBuf>,
        groups: u32,
        workgroup_size: u32,
        local_mem_bytes: u64,
    ) -> Self {
        Self {
            executable: executable.into(),
            groups,
            workgroup_size,
            local_mem_bytes,
            discovery: false,
            discipline: LockDiscipline::Spin,
            timed: false,
        }
    }

    /// A discovery run: oversubscribed launch with the protocol enabled
    /// under the given lock discipline.
    pub fn discovery_run(
        executable: impl Into<PathBuf>,
        workgroup_size: u32,
        local_mem_bytes: u64,
        discipline: LockDiscipline,
    ) -> Self {
        Self {
            executable: executable.into(),
            groups: DISCOVERY_LAUNCH_GROUPS,
            workgroup_size,
            local_mem_bytes,
            discovery: true,
            discipline,
            timed: false,
        }
    }

    /// A timing run: oversubscribed launch of the timing probe, which takes
    /// only a discipline flag and reports `kernel time:` on stdout.
    pub fn timing_run(
        executable: impl Into<PathBuf>,
        workgroup_size: u32,
        local_mem_bytes: u64,
        discipline: LockDiscipline,
    ) -> Self {
        Self {
            executable: executable.into(),
            groups: DISCOVERY_LAUNCH_GROUPS,
            workgroup_size,
            local_mem_bytes,
            discovery: false,
            discipline,
            timed: true,
        }
    }

    pub fn with_groups(mut self, groups: u32) -> Self {
        self.groups = groups;
        self
    }

    /// Positional argument list per the probe CLI contract.
    pub fn argv(&self) -> Vec<String> {
        if self.timed {
            vec![
                self.groups.to_string(),
                self.workgroup_size.to_string(),
                self.local_mem_bytes.to_string(),
                self.discipline.flag().to_string(),
            ]
        } else {
            vec![
                self.groups.to_string(),
                self.workgroup_size.to_string(),
                self.local_mem_bytes.to_string(),
                if self.discovery { "1" } else { "0" }.to_string(),
                self.discipline.flag().to_string(),
            ]
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Full command line, for logs and error context.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.executable.display().to_string()];
        parts.extend(self.argv());
        parts.join(" ")
    }
}

/// Stdout contract followed by a tuning application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TuningOutput {
    /// Reports `kernel time = <float>` only.
    KernelTime,
    /// Reports `app runtime = <float>` plus
    /// `number of participating groups = <int>`.
    AppRuntime,
}

/// One invocation of a workgroup-size tuning probe (graph application).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfiguration {
    pub executable: PathBuf,
    pub dataset: PathBuf,
    /// Graph input format selector, for applications that take one.
    pub graph_format: Option<u32>,
    pub workgroup_size: u32,
    pub output: TuningOutput,
}

impl TuningConfiguration {
    pub fn argv(&self) -> Vec<String> {
        let mut args = vec![self.dataset.display().to_string()];
        if let Some(format) = self.graph_format {
            args.push(format.to_string());
        }
        args.push(self.workgroup_size.to_string());
        args
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.executable.display().to_string()];
        parts.extend(self.argv());
        parts.join(" ")
    }
}

/// Result of one probe execution after output extraction.
///
/// Consumed immediately by the search or the aggregator; never persisted
/// beyond the trial that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    Completed {
        /// Concurrently resident workgroups the probe observed. Absent for
        /// tuning probes, which only report a kernel time.
        groups: Option<u64>,
        /// Kernel time in seconds, for timing and tuning probes.
        elapsed_seconds: Option<f64>,
    },
    TimedOut,
    Malformed {
        raw: String,
        reason: String,
    },
}

impl ProbeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Seam between the search/aggregation logic and real process execution.
///
/// The frontier search only needs a feasible/infeasible answer per
/// concurrency level; tests substitute synthetic step functions here.
pub trait ConcurrencyProbe {
    fn check(&mut self, level: u32) -> HarnessResult<Feasibility>;
}

/// Seam for repeated-trial probes: each call executes one full probe run
/// and extracts its structured outcome.
pub trait TrialProbe {
    fn run_trial(&mut self) -> HarnessResult<ProbeOutcome>;

    /// Human-readable description used in failure reports.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontier_step_argv_disables_discovery() {
        let config = ProbeConfiguration::frontier_step("occupancy_test", 64, 256, 1);
        assert_eq!(config.argv(), vec!["64", "256", "1", "0", "0"]);
    }

    #[test]
    fn discovery_run_argv_oversubscribes() {
        let config =
            ProbeConfiguration::discovery_run("occupancy_test", 256, 1, LockDiscipline::Ticket);
        assert_eq!(config.argv(), vec!["1000", "256", "1", "1", "1"]);
    }

    #[test]
    fn timing_run_argv_drops_discovery_flag() {
        let config = ProbeConfiguration::timing_run("time_prot", 128, 1, LockDiscipline::Spin);
        assert_eq!(config.argv(), vec!["1000", "128", "1", "0"]);
    }

    #[test]
    fn tuning_argv_order() {
        let config = TuningConfiguration {
            executable: "sssp".into(),
            dataset: "data/USA-road-d.NW.gr".into(),
            graph_format: Some(0),
            workgroup_size: 64,
            output: TuningOutput::KernelTime,
        };
        assert_eq!(config.argv(), vec!["data/USA-road-d.NW.gr", "0", "64"]);
    }

    #[test]
    fn tuning_argv_without_format_selector() {
        let config = TuningConfiguration {
            executable: "bfs-port".into(),
            dataset: "data/rmat22.gr".into(),
            graph_format: None,
            workgroup_size: 128,
            output: TuningOutput::AppRuntime,
        };
        assert_eq!(config.argv(), vec!["data/rmat22.gr", "128"]);
    }

    #[test]
    fn command_line_includes_executable() {
        let config = ProbeConfiguration::frontier_step("occupancy_test", 8, 1, 1);
        assert_eq!(config.command_line(), "occupancy_test 8 1 1 0 0");
    }
}
