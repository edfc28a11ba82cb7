//! Protocol timing sweep: kernel time of the spin vs. ticket discovery
//! protocols across the workgroup-size range, with a ticket-based occupancy
//! pre-estimate per size.

use occ_types::{
    DeviceProfile, HarnessConfig, HarnessError, HarnessResult, LockDiscipline,
    ProbeConfiguration, Summary, SweepError, SweepRecord, SweepReport, TimingRecord,
};
use occ_probe::{DisciplineTrialProbe, ProbeExecutor};
use occ_search::{AggregateOutcome, TrialAggregator};
use tracing::{error, info};

/// Name of the timing probe executable.
pub const TIMING_PROBE: &str = "time_prot";

/// Workgroup-size step between timing cells.
const WGS_INCREMENT: u32 = 8;

/// Fixed run count for the max-occupancy pre-estimate.
const ESTIMATE_RUNS: usize = 10;

/// Candidate workgroup sizes: 1, 8, 16, ... up to the device maximum.
pub fn timing_sizes(device: &DeviceProfile) -> Vec<u32> {
    (0..=device.max_workgroup_size / WGS_INCREMENT)
        .map(|step| (step * WGS_INCREMENT).max(1))
        .collect()
}

/// Run the timing sweep across the workgroup-size range.
pub fn run_timing_sweep(
    config: &HarnessConfig,
    executor: &ProbeExecutor,
    device: &DeviceProfile,
) -> HarnessResult<SweepReport> {
    let mut report = SweepReport::new(&config.run_name, device.clone(), config.iterations);

    for workgroup_size in timing_sizes(device) {
        info!(workgroup_size, "timing configuration");
        match run_size(config, executor, workgroup_size) {
            Ok(record) => report.push(SweepRecord::Timing(record)),
            Err(err @ HarnessError::Sweep(SweepError::ConfigurationFailure { .. }))
                if config.keep_going =>
            {
                let label = format!("workgroup size {workgroup_size}");
                error!(%label, error = %err, "configuration failed, continuing per policy");
                report.mark_skipped(label, err.to_string());
            }
            Err(err) => return Err(err),
        }
    }

    report.finish();
    Ok(report)
}

fn run_size(
    config: &HarnessConfig,
    executor: &ProbeExecutor,
    workgroup_size: u32,
) -> HarnessResult<TimingRecord> {
    // Local memory pressure is not part of this sweep; probes run with the
    // minimal allocation.
    let local_mem_bytes = 1;

    let estimate = run_discipline(
        config,
        executor,
        &TrialAggregator::new(ESTIMATE_RUNS, config.retry_cap),
        workgroup_size,
        local_mem_bytes,
        LockDiscipline::Ticket,
    )?;
    let estimated_occupancy = estimate.outcome.max_groups().unwrap_or(0);

    let aggregator = TrialAggregator::new(config.iterations, config.retry_cap);
    let ticket = run_discipline(
        config,
        executor,
        &aggregator,
        workgroup_size,
        local_mem_bytes,
        LockDiscipline::Ticket,
    )?;
    let spin = run_discipline(
        config,
        executor,
        &aggregator,
        workgroup_size,
        local_mem_bytes,
        LockDiscipline::Spin,
    )?;

    Ok(TimingRecord {
        workgroup_size,
        estimated_occupancy,
        ticket_time: ticket.kernel_time,
        spin_time: spin.kernel_time,
        ticket_occupancy: ticket.occupancy,
        spin_occupancy: spin.occupancy,
    })
}

struct TimedSummaries {
    outcome: AggregateOutcome,
    kernel_time: Summary,
    occupancy: Summary,
}

fn run_discipline(
    config: &HarnessConfig,
    executor: &ProbeExecutor,
    aggregator: &TrialAggregator,
    workgroup_size: u32,
    local_mem_bytes: u64,
    discipline: LockDiscipline,
) -> HarnessResult<TimedSummaries> {
    let probe_config = ProbeConfiguration::timing_run(
        config.probe_path(TIMING_PROBE),
        workgroup_size,
        local_mem_bytes,
        discipline,
    );
    let description = probe_config.command_line();
    let mut probe = DisciplineTrialProbe::new(executor, probe_config, config.trial_deadline);
    let outcome = aggregator.aggregate(&mut probe)?;

    let missing = |what: &str| SweepError::ConfigurationFailure {
        configuration: description.clone(),
        attempts: 0,
        reason: format!("no {what} samples collected"),
    };
    let kernel_time = outcome.kernel_time.ok_or_else(|| missing("kernel-time"))?;
    let occupancy = outcome.occupancy.ok_or_else(|| missing("occupancy"))?;

    Ok(TimedSummaries {
        outcome,
        kernel_time,
        occupancy,
    })
}
