//! Workgroup-size tuning sweep for the graph applications: evaluate
//! doubling candidate sizes per {program, dataset, variant} and keep the
//! fastest.
//!
//! Two application suites are tunable. The pannotia suite reports a kernel
//! time and comes in plain and `-gb` barrier builds; the ported lonestar
//! suite reports a whole-app runtime plus a participating-group count and
//! has a single `-port` build per program.

use std::path::Path;

use occ_types::{
    DeviceProfile, HarnessConfig, HarnessError, HarnessResult, SweepError, SweepRecord,
    SweepReport, TuningConfiguration, TuningOutput, TuningRecord,
};
use occ_probe::{ProbeExecutor, TuningTrialProbe};
use occ_search::TrialAggregator;
use tracing::{error, info};

/// Smallest candidate workgroup size.
const FIRST_CANDIDATE: u32 = 32;

/// Suffix of the pannotia barrier-variant executables.
const BARRIER_SUFFIX: &str = "-gb";

/// Suffix of the ported lonestar executables.
const PORT_SUFFIX: &str = "-port";

/// A graph application and the datasets it is tuned against.
pub struct TuningProgram {
    pub name: &'static str,
    /// Graph input format selector, for applications that take one.
    pub graph_format: Option<u32>,
    pub datasets: &'static [&'static str],
}

/// The pannotia application suite.
pub const PANNOTIA_PROGRAMS: &[TuningProgram] = &[
    TuningProgram {
        name: "sssp",
        graph_format: Some(0),
        datasets: &["sssp/USA-road-d.NW.gr"],
    },
    TuningProgram {
        name: "bc",
        graph_format: Some(0),
        datasets: &["bc/1k_128k.gr", "bc/2k_1M.gr"],
    },
    TuningProgram {
        name: "color",
        graph_format: Some(1),
        datasets: &["color/G3_circuit.graph", "color/ecology1.graph"],
    },
    TuningProgram {
        name: "mis",
        graph_format: Some(1),
        datasets: &["color/G3_circuit.graph", "color/ecology1.graph"],
    },
];

/// The ported lonestar application suite.
pub const LONESTAR_PROGRAMS: &[TuningProgram] = &[
    TuningProgram {
        name: "bfs",
        graph_format: None,
        datasets: &["USA-road-d.USA.gr", "r4-2e23.gr", "rmat22.gr"],
    },
    TuningProgram {
        name: "mst",
        graph_format: None,
        datasets: &["2d-2e20.sym.gr", "USA-road-d.FLA.sym.gr", "rmat12.sym.gr"],
    },
    TuningProgram {
        name: "sssp",
        graph_format: None,
        datasets: &["USA-road-d.USA.gr", "r4-2e23.gr", "rmat22.gr"],
    },
];

/// Which application suite a tuning run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningSuite {
    Pannotia,
    Lonestar,
}

impl TuningSuite {
    pub fn programs(&self) -> &'static [TuningProgram] {
        match self {
            Self::Pannotia => PANNOTIA_PROGRAMS,
            Self::Lonestar => LONESTAR_PROGRAMS,
        }
    }

    /// Build variants per program: pannotia has plain and barrier builds,
    /// lonestar only the ported build.
    fn barrier_variants(&self) -> &'static [bool] {
        match self {
            Self::Pannotia => &[false, true],
            Self::Lonestar => &[false],
        }
    }

    fn executable_name(&self, program: &str, barrier_variant: bool) -> String {
        match self {
            Self::Pannotia if barrier_variant => format!("{program}{BARRIER_SUFFIX}"),
            Self::Pannotia => program.to_string(),
            Self::Lonestar => format!("{program}{PORT_SUFFIX}"),
        }
    }

    fn output(&self) -> TuningOutput {
        match self {
            Self::Pannotia => TuningOutput::KernelTime,
            Self::Lonestar => TuningOutput::AppRuntime,
        }
    }
}

/// Candidate sizes 32, 64, ... doubling up to `max_workgroup_size`.
pub fn candidate_sizes(max_workgroup_size: u32) -> Vec<u32> {
    let mut sizes = Vec::new();
    let mut size = FIRST_CANDIDATE;
    while size <= max_workgroup_size {
        sizes.push(size);
        size *= 2;
    }
    sizes
}

/// Run the tuning sweep across the chosen suite.
pub fn run_tuning_sweep(
    config: &HarnessConfig,
    executor: &ProbeExecutor,
    device: &DeviceProfile,
    suite: TuningSuite,
) -> HarnessResult<SweepReport> {
    let data_dir = config
        .data_dir
        .clone()
        .ok_or_else(|| occ_types::config_error!("tuning sweep requires a data directory"))?;
    let mut report = SweepReport::new(&config.run_name, device.clone(), config.iterations);

    for program in suite.programs() {
        for dataset in program.datasets {
            for &barrier_variant in suite.barrier_variants() {
                let label = format!(
                    "{} on {}",
                    suite.executable_name(program.name, barrier_variant),
                    dataset
                );
                info!(%label, "tuning configuration");
                match tune_one(
                    config,
                    executor,
                    device,
                    suite,
                    &data_dir,
                    program,
                    dataset,
                    barrier_variant,
                ) {
                    Ok(record) => report.push(SweepRecord::Tuning(record)),
                    Err(err @ HarnessError::Sweep(SweepError::ConfigurationFailure { .. }))
                        if config.keep_going =>
                    {
                        error!(%label, error = %err, "configuration failed, continuing per policy");
                        report.mark_skipped(label, err.to_string());
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }

    report.finish();
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn tune_one(
    config: &HarnessConfig,
    executor: &ProbeExecutor,
    device: &DeviceProfile,
    suite: TuningSuite,
    data_dir: &Path,
    program: &TuningProgram,
    dataset: &str,
    barrier_variant: bool,
) -> HarnessResult<TuningRecord> {
    let executable = config.probe_path(&suite.executable_name(program.name, barrier_variant));
    let aggregator = TrialAggregator::new(config.iterations, config.retry_cap);

    // (size, mean time, max participating groups) per candidate.
    let mut evaluated: Vec<(u32, f64, Option<u64>)> = Vec::new();
    for workgroup_size in candidate_sizes(device.max_workgroup_size) {
        let tuning_config = TuningConfiguration {
            executable: executable.clone(),
            dataset: data_dir.join(dataset),
            graph_format: program.graph_format,
            workgroup_size,
            output: suite.output(),
        };
        let description = tuning_config.command_line();
        let mut probe = TuningTrialProbe::new(executor, tuning_config, config.trial_deadline);
        let outcome = aggregator.aggregate(&mut probe)?;
        let times = outcome
            .kernel_time
            .ok_or_else(|| SweepError::ConfigurationFailure {
                configuration: description,
                attempts: 0,
                reason: "no kernel-time samples collected".to_string(),
            })?;
        info!(workgroup_size, mean = times.mean, "candidate evaluated");
        evaluated.push((workgroup_size, times.mean, outcome.max_groups()));
    }

    let (chosen_workgroup_size, mean_kernel_time, participating_groups) = evaluated
        .iter()
        .copied()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| SweepError::ConfigurationFailure {
            configuration: executable.display().to_string(),
            attempts: 0,
            reason: format!(
                "no candidate workgroup sizes at or below {}",
                device.max_workgroup_size
            ),
        })?;

    info!(chosen_workgroup_size, mean_kernel_time, "candidate chosen");
    Ok(TuningRecord {
        program: program.name.to_string(),
        dataset: dataset.to_string(),
        barrier_variant,
        chosen_workgroup_size,
        mean_kernel_time,
        participating_groups,
        candidates: evaluated
            .iter()
            .map(|&(wgs, mean, _)| (wgs, mean))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_double_up_to_max() {
        assert_eq!(candidate_sizes(256), vec![32, 64, 128, 256]);
        assert_eq!(candidate_sizes(300), vec![32, 64, 128, 256]);
    }

    #[test]
    fn too_small_device_has_no_candidates() {
        assert!(candidate_sizes(16).is_empty());
    }

    #[test]
    fn pannotia_suite_covers_every_dataset() {
        let pairs: usize = PANNOTIA_PROGRAMS.iter().map(|p| p.datasets.len()).sum();
        assert_eq!(pairs, 7);
    }

    #[test]
    fn lonestar_suite_covers_every_dataset() {
        let pairs: usize = LONESTAR_PROGRAMS.iter().map(|p| p.datasets.len()).sum();
        assert_eq!(pairs, 9);
        assert!(LONESTAR_PROGRAMS.iter().all(|p| p.graph_format.is_none()));
    }

    #[test]
    fn executable_naming_per_suite() {
        assert_eq!(TuningSuite::Pannotia.executable_name("sssp", false), "sssp");
        assert_eq!(
            TuningSuite::Pannotia.executable_name("sssp", true),
            "sssp-gb"
        );
        assert_eq!(
            TuningSuite::Lonestar.executable_name("bfs", false),
            "bfs-port"
        );
    }

    #[test]
    fn lonestar_has_no_barrier_variant() {
        assert_eq!(TuningSuite::Lonestar.barrier_variants(), &[false]);
        assert_eq!(TuningSuite::Pannotia.barrier_variants(), &[false, true]);
    }

    #[cfg(unix)]
    fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{body}").unwrap();
        let mut perms = file.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
    }

    #[cfg(unix)]
    fn small_device() -> DeviceProfile {
        DeviceProfile {
            name: "Synthetic GPU".to_string(),
            vendor: "Test".to_string(),
            local_memory_bytes: 4096,
            max_workgroup_size: 128,
            compute_unit_count: 4,
        }
    }

    #[cfg(unix)]
    #[test]
    fn tuning_picks_the_fastest_candidate() {
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        for name in ["sssp", "sssp-gb"] {
            // Kernel time grows away from workgroup size 64 ($3), so 64
            // must win for both variants.
            write_script(
                &dir,
                name,
                "if [ \"$3\" = \"64\" ]; then echo 'kernel time = 0.5'; \
                 else echo 'kernel time = 2.'\"$3\"; fi",
            );
        }

        let mut config = HarnessConfig::new(dir.path(), "tune").with_iterations(2);
        config.data_dir = Some(dir.path().to_path_buf());
        config.trial_deadline = Duration::from_secs(10);
        let executor = ProbeExecutor::new();

        let record = tune_one(
            &config,
            &executor,
            &small_device(),
            TuningSuite::Pannotia,
            &config.data_dir.clone().unwrap(),
            &PANNOTIA_PROGRAMS[0],
            PANNOTIA_PROGRAMS[0].datasets[0],
            false,
        )
        .unwrap();

        assert_eq!(record.chosen_workgroup_size, 64);
        assert_eq!(record.mean_kernel_time, 0.5);
        assert_eq!(record.participating_groups, None);
        assert_eq!(record.candidates.len(), 3); // 32, 64, 128
    }

    #[cfg(unix)]
    #[test]
    fn lonestar_tuning_tracks_participating_groups() {
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        // Ported contract: dataset then wgs ($2), no format selector.
        // Runtime grows with the size, so 32 wins; group count tracks the
        // size.
        write_script(
            &dir,
            "bfs-port",
            "echo 'app runtime = '\"$2\"'.5'\n\
             echo 'number of participating groups = '\"$2\"",
        );

        let mut config = HarnessConfig::new(dir.path(), "tune").with_iterations(2);
        config.data_dir = Some(dir.path().to_path_buf());
        config.trial_deadline = Duration::from_secs(10);
        let executor = ProbeExecutor::new();

        let record = tune_one(
            &config,
            &executor,
            &small_device(),
            TuningSuite::Lonestar,
            &config.data_dir.clone().unwrap(),
            &LONESTAR_PROGRAMS[0],
            LONESTAR_PROGRAMS[0].datasets[0],
            false,
        )
        .unwrap();

        assert_eq!(record.chosen_workgroup_size, 32);
        assert_eq!(record.participating_groups, Some(32));
        assert_eq!(record.candidates.len(), 3);
    }
}
