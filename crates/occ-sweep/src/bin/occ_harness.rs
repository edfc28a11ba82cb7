//! Command-line entry point for the occupancy harness.
//!
//! One subcommand per sweep. Every run starts with a device query so the
//! configuration grid can be derived from the hardware actually present.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use occ_probe::{default_runner, query_device, ProbeExecutor};
use occ_sweep::{
    run_occupancy_sweep, run_timing_sweep, run_tuning_sweep, write_occupancy_report,
    write_timing_report, write_tuning_report, TuningSuite, DEVICE_QUERY_PROBE,
};
use occ_types::{HarnessConfig, DEFAULT_RETRY_CAP, DEFAULT_SEARCH_HIGH};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "occ-harness",
    about = "GPU occupancy characterization harness",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Frontier search plus discovery-protocol measurement across the
    /// {memory pressure, workgroup size} grid.
    Occupancy(CommonArgs),
    /// Spin vs. ticket kernel timing across the workgroup-size range.
    Timing(CommonArgs),
    /// Workgroup-size tuning for the graph application suite.
    Tune(TuneArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Directory holding the probe executables.
    #[arg(long)]
    probe_dir: PathBuf,

    /// Name for this run, used in report metadata and tuning file names.
    #[arg(long, default_value = "occupancy-run")]
    run_name: String,

    /// Override the queried device name in report file names.
    #[arg(long)]
    chip_name: Option<String>,

    /// Trials per configuration.
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Per-probe deadline for frontier search steps, in seconds.
    #[arg(long, default_value_t = 7)]
    search_deadline_secs: u64,

    /// Deadline for discovery, timing and tuning runs, in seconds.
    #[arg(long, default_value_t = 120)]
    trial_deadline_secs: u64,

    /// Inclusive upper bound of the frontier search range.
    #[arg(long, default_value_t = DEFAULT_SEARCH_HIGH)]
    search_high: u32,

    /// Attempts per trial before a configuration is declared failed.
    #[arg(long, default_value_t = DEFAULT_RETRY_CAP)]
    retry_cap: usize,

    /// Record failed configurations as skipped instead of aborting.
    #[arg(long)]
    keep_going: bool,

    /// Directory report files are written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Args)]
struct TuneArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory holding the benchmark graph datasets.
    #[arg(long)]
    data_dir: PathBuf,

    /// Cap the candidate workgroup sizes below the device maximum.
    #[arg(long)]
    max_wgs: Option<u32>,

    /// Application suite to tune.
    #[arg(long, default_value = "pannotia", value_parser = ["pannotia", "lonestar"])]
    suite: String,
}

impl TuneArgs {
    fn suite(&self) -> TuningSuite {
        match self.suite.as_str() {
            "lonestar" => TuningSuite::Lonestar,
            _ => TuningSuite::Pannotia,
        }
    }
}

impl CommonArgs {
    fn harness_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::new(&self.probe_dir, &self.run_name)
            .with_iterations(self.iterations)
            .with_retry_cap(self.retry_cap)
            .with_keep_going(self.keep_going);
        config.chip_name = self.chip_name.clone();
        config.search_deadline = Duration::from_secs(self.search_deadline_secs);
        config.trial_deadline = Duration::from_secs(self.trial_deadline_secs);
        config.search_high = self.search_high;
        config.output_dir = self.output_dir.clone();
        config
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (common, data_dir) = match &cli.command {
        Command::Occupancy(args) | Command::Timing(args) => (args, None),
        Command::Tune(args) => (&args.common, Some(args.data_dir.clone())),
    };
    let mut config = common.harness_config();
    config.data_dir = data_dir;

    let runner = default_runner();
    let query_path = config.probe_path(DEVICE_QUERY_PROBE);
    let mut device = query_device(runner.as_ref(), &query_path)
        .with_context(|| format!("device query via `{}`", query_path.display()))?;
    if let Command::Tune(args) = &cli.command {
        if let Some(max_wgs) = args.max_wgs {
            device.max_workgroup_size = device.max_workgroup_size.min(max_wgs);
        }
    }
    let executor = ProbeExecutor::new();

    let report_path = match cli.command {
        Command::Occupancy(_) => {
            let report = run_occupancy_sweep(&config, &executor, &device)?;
            write_occupancy_report(&config, &report)?
        }
        Command::Timing(_) => {
            let report = run_timing_sweep(&config, &executor, &device)?;
            write_timing_report(&config, &report)?
        }
        Command::Tune(args) => {
            let report = run_tuning_sweep(&config, &executor, &device, args.suite())?;
            write_tuning_report(&config, &report)?
        }
    };

    info!(report = %report_path.display(), "sweep complete");
    Ok(())
}
