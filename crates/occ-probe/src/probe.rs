//! Probe execution: bounded runner + output extraction, surfaced through
//! the seams the search and aggregation layers consume.

use std::time::Duration;

use occ_types::{
    ConcurrencyProbe, Feasibility, HarnessResult, ProbeConfiguration, ProbeError, ProbeOutcome,
    TrialProbe, TuningConfiguration, TuningOutput,
};
use tracing::{debug, error, info};

use crate::extract::{
    extract_float, extract_integer, APP_RUNTIME_MARKER, GROUPS_MARKER, KERNEL_TIME_EQ_MARKER,
    KERNEL_TIME_MARKER, PARTICIPATING_GROUPS_MARKER,
};
use crate::runner::{default_runner, BoundedRunner, RunResult};

/// Executes probe configurations and turns raw process results into
/// structured outcomes.
///
/// Holds no per-probe state; one executor is shared (by reference) across
/// every search step and trial of a run, all strictly serialized.
pub struct ProbeExecutor {
    runner: Box<dyn BoundedRunner>,
}

impl ProbeExecutor {
    pub fn new() -> Self {
        let runner = default_runner();
        info!(runner = runner.name(), "selected process runner");
        Self { runner }
    }

    pub fn with_runner(runner: Box<dyn BoundedRunner>) -> Self {
        Self { runner }
    }

    /// Run a frontier-search step and classify it by deadline only.
    ///
    /// Stdout is deliberately ignored here: a plain launch either finishes
    /// in time or it does not, and that is the whole signal.
    pub fn feasibility(
        &self,
        config: &ProbeConfiguration,
        deadline: Duration,
    ) -> HarnessResult<Feasibility> {
        match self.run_checked(config, deadline)? {
            None => Ok(Feasibility::Infeasible),
            Some(_) => Ok(Feasibility::Feasible),
        }
    }

    /// Run a discovery or timing probe and extract its structured outcome.
    pub fn execute(
        &self,
        config: &ProbeConfiguration,
        deadline: Duration,
    ) -> HarnessResult<ProbeOutcome> {
        let stdout = match self.run_checked(config, deadline)? {
            None => return Ok(ProbeOutcome::TimedOut),
            Some(stdout) => stdout,
        };

        let groups = match extract_integer(&stdout, GROUPS_MARKER) {
            Ok(groups) => groups,
            Err(reason) => return Ok(malformed(stdout, reason.to_string())),
        };
        let elapsed_seconds = if config.timed {
            match extract_float(&stdout, KERNEL_TIME_MARKER) {
                Ok(seconds) => Some(seconds),
                Err(reason) => return Ok(malformed(stdout, reason.to_string())),
            }
        } else {
            None
        };

        Ok(ProbeOutcome::Completed {
            groups: Some(groups),
            elapsed_seconds,
        })
    }

    /// Run a graph-application tuning probe and extract the facts its
    /// output contract promises.
    pub fn execute_tuning(
        &self,
        config: &TuningConfiguration,
        deadline: Duration,
    ) -> HarnessResult<ProbeOutcome> {
        debug!(command = %config.command_line(), "running tuning probe");
        let result = self
            .runner
            .run(&config.executable, &config.argv(), deadline)?;
        let stdout = match completed_stdout(result, || config.command_line())? {
            None => return Ok(ProbeOutcome::TimedOut),
            Some(stdout) => stdout,
        };
        match config.output {
            TuningOutput::KernelTime => match extract_float(&stdout, KERNEL_TIME_EQ_MARKER) {
                Ok(seconds) => Ok(ProbeOutcome::Completed {
                    groups: None,
                    elapsed_seconds: Some(seconds),
                }),
                Err(reason) => Ok(malformed(stdout, reason.to_string())),
            },
            TuningOutput::AppRuntime => {
                let seconds = match extract_float(&stdout, APP_RUNTIME_MARKER) {
                    Ok(seconds) => seconds,
                    Err(reason) => return Ok(malformed(stdout, reason.to_string())),
                };
                match extract_integer(&stdout, PARTICIPATING_GROUPS_MARKER) {
                    Ok(groups) => Ok(ProbeOutcome::Completed {
                        groups: Some(groups),
                        elapsed_seconds: Some(seconds),
                    }),
                    Err(reason) => Ok(malformed(stdout, reason.to_string())),
                }
            }
        }
    }

    /// Shared run-and-gate: `None` means timed out, `Some(stdout)` means the
    /// probe completed successfully. A non-zero exit is fatal, not a timeout.
    fn run_checked(
        &self,
        config: &ProbeConfiguration,
        deadline: Duration,
    ) -> HarnessResult<Option<String>> {
        debug!(command = %config.command_line(), "running probe");
        let result = self
            .runner
            .run(config.executable(), &config.argv(), deadline)?;
        completed_stdout(result, || config.command_line())
    }
}

impl Default for ProbeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn completed_stdout(
    result: RunResult,
    command: impl Fn() -> String,
) -> HarnessResult<Option<String>> {
    match result {
        RunResult::TimedOut => Ok(None),
        RunResult::Completed {
            exit_code: 0,
            stdout,
            ..
        } => Ok(Some(stdout)),
        RunResult::Completed {
            exit_code,
            stdout,
            stderr,
        } => {
            let command = command();
            error!(%command, exit_code, %stdout, %stderr, "probe exited with failure");
            Err(ProbeError::NonZeroExit {
                command,
                code: exit_code,
                stderr,
            }
            .into())
        }
    }
}

fn malformed(raw: String, reason: String) -> ProbeOutcome {
    ProbeOutcome::Malformed { raw, reason }
}

/// Adapts the executor to the frontier search: a probe whose concurrency
/// level varies per step while everything else stays fixed.
pub struct FrontierProbe<'a> {
    executor: &'a ProbeExecutor,
    base: ProbeConfiguration,
    deadline: Duration,
}

impl<'a> FrontierProbe<'a> {
    pub fn new(executor: &'a ProbeExecutor, base: ProbeConfiguration, deadline: Duration) -> Self {
        Self {
            executor,
            base,
            deadline,
        }
    }
}

impl ConcurrencyProbe for FrontierProbe<'_> {
    fn check(&mut self, level: u32) -> HarnessResult<Feasibility> {
        let step = self.base.clone().with_groups(level);
        self.executor.feasibility(&step, self.deadline)
    }
}

/// Adapts the executor to repeated discovery/timing trials of one fixed
/// configuration.
pub struct DisciplineTrialProbe<'a> {
    executor: &'a ProbeExecutor,
    config: ProbeConfiguration,
    deadline: Duration,
}

impl<'a> DisciplineTrialProbe<'a> {
    pub fn new(
        executor: &'a ProbeExecutor,
        config: ProbeConfiguration,
        deadline: Duration,
    ) -> Self {
        Self {
            executor,
            config,
            deadline,
        }
    }
}

impl TrialProbe for DisciplineTrialProbe<'_> {
    fn run_trial(&mut self) -> HarnessResult<ProbeOutcome> {
        self.executor.execute(&self.config, self.deadline)
    }

    fn describe(&self) -> String {
        self.config.command_line()
    }
}

/// Adapts the executor to repeated tuning trials.
pub struct TuningTrialProbe<'a> {
    executor: &'a ProbeExecutor,
    config: TuningConfiguration,
    deadline: Duration,
}

impl<'a> TuningTrialProbe<'a> {
    pub fn new(
        executor: &'a ProbeExecutor,
        config: TuningConfiguration,
        deadline: Duration,
    ) -> Self {
        Self {
            executor,
            config,
            deadline,
        }
    }
}

impl TrialProbe for TuningTrialProbe<'_> {
    fn run_trial(&mut self) -> HarnessResult<ProbeOutcome> {
        self.executor.execute_tuning(&self.config, self.deadline)
    }

    fn describe(&self) -> String {
        self.config.command_line()
    }
}
