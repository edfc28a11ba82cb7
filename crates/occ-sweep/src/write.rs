//! Report file output.
//!
//! Text reports are named after the measured device (sanitized for the
//! filesystem), one header line naming columns and one space-separated
//! line per configuration, so runs on the same chip overwrite rather than
//! accumulate. A JSON sidecar carries the full structured report.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use occ_types::{
    sanitize_file_stem, HarnessConfig, HarnessResult, Summary, SweepRecord, SweepReport,
};
use tracing::info;

/// File stem for a run: the chip-name override when given, otherwise the
/// queried device name.
pub fn report_stem(config: &HarnessConfig, report: &SweepReport) -> String {
    match &config.chip_name {
        Some(chip) => sanitize_file_stem(chip),
        None => report.device.file_stem(),
    }
}

/// Write the occupancy sweep report: `<stem>.txt` plus JSON sidecar.
pub fn write_occupancy_report(
    config: &HarnessConfig,
    report: &SweepReport,
) -> HarnessResult<PathBuf> {
    let stem = report_stem(config, report);
    let mut text =
        String::from("mean min max stddev discipline local_mem wgs frontier iterations\n");
    for record in &report.records {
        if let SweepRecord::Occupancy(cell) = record {
            for summary in [&cell.spin, &cell.ticket] {
                let _ = writeln!(
                    text,
                    "{} {} {} {} {} {}",
                    summary_columns(&summary.occupancy),
                    summary.discipline,
                    cell.local_mem_bytes,
                    cell.workgroup_size,
                    cell.frontier,
                    summary.occupancy.sample_count,
                );
            }
        }
    }
    write_pair(config, report, format!("{stem}.txt"), text)
}

/// Write the timing sweep report: `<stem>_timing.txt` plus JSON sidecar.
///
/// Column set is the one the downstream plotting tools already consume;
/// rows follow the workgroup-size enumeration order.
pub fn write_timing_report(
    config: &HarnessConfig,
    report: &SweepReport,
) -> HarnessResult<PathBuf> {
    let stem = report_stem(config, report);
    let mut text = String::from("true_occ ticket_avg_time spin_avg_time ticket_avg_occ spin_avg_occ\n");
    for record in &report.records {
        if let SweepRecord::Timing(cell) = record {
            let _ = writeln!(
                text,
                "{} {} {} {} {}",
                cell.estimated_occupancy,
                cell.ticket_time.mean,
                cell.spin_time.mean,
                cell.ticket_occupancy.mean,
                cell.spin_occupancy.mean,
            );
        }
    }
    write_pair(config, report, format!("{stem}_timing.txt"), text)
}

/// Write the tuning sweep data file: `<run>_data.txt` plus JSON sidecar.
///
/// One line per configuration in the lookup-table syntax the workgroup-size
/// tables are maintained in.
pub fn write_tuning_report(
    config: &HarnessConfig,
    report: &SweepReport,
) -> HarnessResult<PathBuf> {
    let chip = match &config.chip_name {
        Some(chip) => chip.clone(),
        None => report.device.name.clone(),
    };
    let mut text = String::from("# chosen workgroup size per (chip, program, dataset)\n");
    for record in &report.records {
        if let SweepRecord::Tuning(cell) = record {
            // Ported applications record (size, groups) under a three-part
            // key; the barrier-build suite keys on the variant as well.
            let _ = match cell.participating_groups {
                Some(groups) => writeln!(
                    text,
                    "(\"{}\",\"{}\",\"{}\") : ({},{}),",
                    chip, cell.program, cell.dataset, cell.chosen_workgroup_size, groups,
                ),
                None => writeln!(
                    text,
                    "(\"{}\",\"{}\",\"{}\",\"{}\") : {},",
                    chip,
                    cell.program,
                    cell.dataset,
                    if cell.barrier_variant { "gb" } else { "" },
                    cell.chosen_workgroup_size,
                ),
            };
        }
    }
    let stem = sanitize_file_stem(&config.run_name);
    write_pair(config, report, format!("{stem}_data.txt"), text)
}

fn summary_columns(summary: &Summary) -> String {
    format!(
        "{} {} {} {}",
        summary.mean, summary.min, summary.max, summary.stddev
    )
}

fn write_pair(
    config: &HarnessConfig,
    report: &SweepReport,
    file_name: String,
    text: String,
) -> HarnessResult<PathBuf> {
    fs::create_dir_all(&config.output_dir)?;
    // Sidecar name tracks the text file name so different sweep kinds on
    // the same device never clobber each other's sidecar.
    let json_name = format!("{}.json", file_name.trim_end_matches(".txt"));
    let text_path = config.output_dir.join(file_name);
    fs::write(&text_path, text)?;
    let json_path = config.output_dir.join(json_name);
    fs::write(&json_path, serde_json::to_string_pretty(report)?)?;
    info!(report = %text_path.display(), sidecar = %json_path.display(), "wrote report");
    Ok(text_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use occ_types::{
        DeviceProfile, DisciplineSummary, Frontier, LockDiscipline, MemoryPressure,
        OccupancyRecord, TimingRecord, TrialSample, TuningRecord, WorkgroupSizing,
    };

    fn device() -> DeviceProfile {
        DeviceProfile {
            name: "Intel(R) HD Graphics 520".to_string(),
            vendor: "Intel".to_string(),
            local_memory_bytes: 65536,
            max_workgroup_size: 256,
            compute_unit_count: 24,
        }
    }

    fn summary(mean: f64) -> Summary {
        Summary {
            mean,
            min: mean - 1.0,
            max: mean + 1.0,
            stddev: 0.5,
            sample_count: 4,
        }
    }

    fn discipline_summary(discipline: LockDiscipline, mean: f64) -> DisciplineSummary {
        DisciplineSummary {
            discipline,
            occupancy: summary(mean),
            kernel_time: None,
            samples: vec![TrialSample {
                groups: Some(mean as u64),
                elapsed_seconds: None,
            }],
        }
    }

    fn config(dir: &tempfile::TempDir) -> HarnessConfig {
        let mut config = HarnessConfig::new("/probes", "unit");
        config.output_dir = dir.path().to_path_buf();
        config
    }

    #[test]
    fn occupancy_report_has_header_and_two_lines_per_cell() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = SweepReport::new("unit", device(), 4);
        report.push(SweepRecord::Occupancy(OccupancyRecord {
            memory_pressure: MemoryPressure::Min,
            workgroup_sizing: WorkgroupSizing::Max,
            workgroup_size: 256,
            local_mem_bytes: 1,
            frontier: Frontier::Found(40),
            spin: discipline_summary(LockDiscipline::Spin, 38.0),
            ticket: discipline_summary(LockDiscipline::Ticket, 40.0),
        }));
        report.finish();

        let path = write_occupancy_report(&config(&dir), &report).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "Intel_R__HD_Graphics_520.txt"
        );
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("mean min max stddev"));
        assert_eq!(lines[1], "38 37 39 0.5 spin 1 256 40 4");
        assert_eq!(lines[2], "40 39 41 0.5 ticket 1 256 40 4");

        // Sidecar carries the full structured report.
        let sidecar = dir.path().join("Intel_R__HD_Graphics_520.json");
        let decoded: SweepReport =
            serde_json::from_str(&fs::read_to_string(sidecar).unwrap()).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn no_feasible_frontier_prints_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = SweepReport::new("unit", device(), 4);
        report.push(SweepRecord::Occupancy(OccupancyRecord {
            memory_pressure: MemoryPressure::Max,
            workgroup_sizing: WorkgroupSizing::Max,
            workgroup_size: 256,
            local_mem_bytes: 65408,
            frontier: Frontier::NoneFeasible,
            spin: discipline_summary(LockDiscipline::Spin, 0.0),
            ticket: discipline_summary(LockDiscipline::Ticket, 0.0),
        }));
        let path = write_occupancy_report(&config(&dir), &report).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(" none"));
    }

    #[test]
    fn chip_name_override_renames_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&dir);
        cfg.chip_name = Some("lab rig (A)".to_string());
        let report = SweepReport::new("unit", device(), 1);
        let path = write_occupancy_report(&cfg, &report).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "lab_rig__A_.txt"
        );
    }

    #[test]
    fn timing_report_columns_match_consumers() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = SweepReport::new("unit", device(), 4);
        report.push(SweepRecord::Timing(TimingRecord {
            workgroup_size: 8,
            estimated_occupancy: 24,
            ticket_time: summary(1.5),
            spin_time: summary(2.5),
            ticket_occupancy: summary(24.0),
            spin_occupancy: summary(23.0),
        }));
        let path = write_timing_report(&config(&dir), &report).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "true_occ ticket_avg_time spin_avg_time ticket_avg_occ spin_avg_occ"
        );
        assert_eq!(text.lines().nth(1).unwrap(), "24 1.5 2.5 24 23");

        // Sidecar name follows the text file name, so a timing run never
        // overwrites the occupancy sidecar for the same device.
        assert!(dir
            .path()
            .join("Intel_R__HD_Graphics_520_timing.json")
            .exists());
        assert!(!dir.path().join("Intel_R__HD_Graphics_520.json").exists());
    }

    #[test]
    fn tuning_report_uses_lookup_table_syntax() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = SweepReport::new("nightly tune", device(), 10);
        report.push(SweepRecord::Tuning(TuningRecord {
            program: "sssp".to_string(),
            dataset: "sssp/USA-road-d.NW.gr".to_string(),
            barrier_variant: true,
            chosen_workgroup_size: 64,
            mean_kernel_time: 0.5,
            participating_groups: None,
            candidates: vec![(32, 0.9), (64, 0.5)],
        }));
        report.push(SweepRecord::Tuning(TuningRecord {
            program: "bfs".to_string(),
            dataset: "rmat22.gr".to_string(),
            barrier_variant: false,
            chosen_workgroup_size: 128,
            mean_kernel_time: 1.25,
            participating_groups: Some(96),
            candidates: vec![(64, 1.5), (128, 1.25)],
        }));
        let mut cfg = config(&dir);
        cfg.run_name = "nightly tune".to_string();
        let path = write_tuning_report(&cfg, &report).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "nightly_tune_data.txt"
        );
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.lines().next().unwrap().starts_with('#'));
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "(\"Intel(R) HD Graphics 520\",\"sssp\",\"sssp/USA-road-d.NW.gr\",\"gb\") : 64,"
        );
        // Ported applications carry their group count in the value tuple.
        assert_eq!(
            text.lines().nth(2).unwrap(),
            "(\"Intel(R) HD Graphics 520\",\"bfs\",\"rmat22.gr\") : (128,96),"
        );
    }
}
