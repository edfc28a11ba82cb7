//! Occupancy sweep: for every {memory pressure, workgroup sizing} cell,
//! locate the occupancy frontier, then measure what the discovery protocol
//! reports under the spin and ticket disciplines at that configuration.
//!
//! Every probe is strictly serialized: the device under measurement is the
//! shared resource, and a second in-flight probe would corrupt the very
//! occupancy being measured.

use occ_types::{
    DeviceProfile, DisciplineSummary, Frontier, HarnessConfig, HarnessError, HarnessResult,
    LockDiscipline, MemoryPressure, OccupancyRecord, ProbeConfiguration, SweepError, SweepRecord,
    SweepReport, WorkgroupSizing,
};
use occ_probe::{DisciplineTrialProbe, FrontierProbe, ProbeExecutor};
use occ_search::{find_frontier, TrialAggregator};
use tracing::{error, info};

/// Name of the occupancy probe executable.
pub const OCCUPANCY_PROBE: &str = "occupancy_test";

/// A sweep cell: one point of the configuration cross-product.
pub type OccupancyCell = (MemoryPressure, WorkgroupSizing);

/// The full cross-product, in the fixed enumeration order reports use.
pub fn all_cells() -> Vec<OccupancyCell> {
    let mut cells = Vec::with_capacity(4);
    for pressure in MemoryPressure::ALL {
        for sizing in WorkgroupSizing::ALL {
            cells.push((pressure, sizing));
        }
    }
    cells
}

/// Run the occupancy sweep over every configuration cell.
pub fn run_occupancy_sweep(
    config: &HarnessConfig,
    executor: &ProbeExecutor,
    device: &DeviceProfile,
) -> HarnessResult<SweepReport> {
    run_occupancy_cells(config, executor, device, &all_cells())
}

/// Run the occupancy sweep over an explicit list of cells.
///
/// A fatal probe error aborts the whole sweep. A configuration failure
/// aborts too unless the caller opted into `keep_going`, in which case the
/// cell is recorded as skipped and the sweep moves on.
pub fn run_occupancy_cells(
    config: &HarnessConfig,
    executor: &ProbeExecutor,
    device: &DeviceProfile,
    cells: &[OccupancyCell],
) -> HarnessResult<SweepReport> {
    let mut report = SweepReport::new(&config.run_name, device.clone(), config.iterations);

    for &(pressure, sizing) in cells {
        let label = format!("{} / {}", pressure.label(), sizing.label());
        info!(%label, "sweeping configuration");

        match run_cell(config, executor, device, pressure, sizing) {
            Ok(record) => report.push(SweepRecord::Occupancy(record)),
            Err(err @ HarnessError::Sweep(SweepError::ConfigurationFailure { .. }))
                if config.keep_going =>
            {
                error!(%label, error = %err, "configuration failed, continuing per policy");
                report.mark_skipped(label, err.to_string());
            }
            Err(err) => {
                error!(%label, error = %err, "configuration failed, aborting sweep");
                return Err(err);
            }
        }
    }

    report.finish();
    Ok(report)
}

fn run_cell(
    config: &HarnessConfig,
    executor: &ProbeExecutor,
    device: &DeviceProfile,
    pressure: MemoryPressure,
    sizing: WorkgroupSizing,
) -> HarnessResult<OccupancyRecord> {
    let exe = config.probe_path(OCCUPANCY_PROBE);
    let workgroup_size = device.workgroup_size_for(sizing);
    let local_mem_bytes = device.local_mem_for(pressure);

    let base = ProbeConfiguration::frontier_step(&exe, 0, workgroup_size, local_mem_bytes);
    let mut frontier_probe = FrontierProbe::new(executor, base, config.search_deadline);
    let frontier = find_frontier(&mut frontier_probe, 0, config.search_high)?;
    if frontier == Frontier::NoneFeasible {
        info!(
            workgroup_size,
            local_mem_bytes, "no feasible concurrency level; measuring discovery runs anyway"
        );
    }

    let aggregator = TrialAggregator::new(config.iterations, config.retry_cap);
    let spin = run_discipline(
        config,
        executor,
        &aggregator,
        workgroup_size,
        local_mem_bytes,
        LockDiscipline::Spin,
    )?;
    let ticket = run_discipline(
        config,
        executor,
        &aggregator,
        workgroup_size,
        local_mem_bytes,
        LockDiscipline::Ticket,
    )?;

    Ok(OccupancyRecord {
        memory_pressure: pressure,
        workgroup_sizing: sizing,
        workgroup_size,
        local_mem_bytes,
        frontier,
        spin,
        ticket,
    })
}

fn run_discipline(
    config: &HarnessConfig,
    executor: &ProbeExecutor,
    aggregator: &TrialAggregator,
    workgroup_size: u32,
    local_mem_bytes: u64,
    discipline: LockDiscipline,
) -> HarnessResult<DisciplineSummary> {
    let probe_config = ProbeConfiguration::discovery_run(
        config.probe_path(OCCUPANCY_PROBE),
        workgroup_size,
        local_mem_bytes,
        discipline,
    );
    let description = probe_config.command_line();
    let mut probe = DisciplineTrialProbe::new(executor, probe_config, config.trial_deadline);
    let outcome = aggregator.aggregate(&mut probe)?;

    let occupancy = outcome.occupancy.ok_or_else(|| {
        SweepError::ConfigurationFailure {
            configuration: description,
            attempts: 0,
            reason: "no occupancy samples collected".to_string(),
        }
    })?;

    info!(
        %discipline,
        mean = occupancy.mean,
        stddev = occupancy.stddev,
        "discipline aggregated"
    );

    Ok(DisciplineSummary {
        discipline,
        occupancy,
        kernel_time: outcome.kernel_time,
        samples: outcome.samples,
    })
}
