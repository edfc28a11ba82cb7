//! Sweep report data model.
//!
//! The report is the sole artifact a sweep hands back to its caller: an
//! append-only sequence of per-configuration records, assembled in
//! enumeration order so output files are reproducible run to run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DeviceProfile, LockDiscipline, MemoryPressure, WorkgroupSizing};

/// Summary statistics over one configuration's trials.
///
/// `stddev` is the population standard deviation (divide by N, not N-1);
/// all consumers must interpret it that way for comparability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
    pub sample_count: usize,
}

/// One extracted trial observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialSample {
    pub groups: Option<u64>,
    pub elapsed_seconds: Option<f64>,
}

/// Frontier search verdict for one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frontier {
    /// Maximal concurrency level that completed within the deadline.
    ///
    /// Best-effort under environmental drift: feasibility is re-observed,
    /// not proven, so a noisy device can shift the reported value.
    Found(u32),
    /// Every level in the searched range timed out.
    NoneFeasible,
}

impl Frontier {
    pub fn found(&self) -> Option<u32> {
        match self {
            Self::Found(n) => Some(*n),
            Self::NoneFeasible => None,
        }
    }
}

impl std::fmt::Display for Frontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found(n) => write!(f, "{n}"),
            Self::NoneFeasible => write!(f, "none"),
        }
    }
}

/// Aggregated measurements for one lock discipline within a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisciplineSummary {
    pub discipline: LockDiscipline,
    pub occupancy: Summary,
    pub kernel_time: Option<Summary>,
    pub samples: Vec<TrialSample>,
}

/// One cell of the occupancy sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyRecord {
    pub memory_pressure: MemoryPressure,
    pub workgroup_sizing: WorkgroupSizing,
    pub workgroup_size: u32,
    pub local_mem_bytes: u64,
    pub frontier: Frontier,
    pub spin: DisciplineSummary,
    pub ticket: DisciplineSummary,
}

/// One cell of the protocol timing sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub workgroup_size: u32,
    /// Max occupancy seen across the ticket pre-estimate runs.
    pub estimated_occupancy: u64,
    pub ticket_time: Summary,
    pub spin_time: Summary,
    pub ticket_occupancy: Summary,
    pub spin_occupancy: Summary,
}

/// One cell of the workgroup-size tuning sweep: the best candidate for a
/// {program, dataset} pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningRecord {
    pub program: String,
    pub dataset: String,
    pub barrier_variant: bool,
    pub chosen_workgroup_size: u32,
    pub mean_kernel_time: f64,
    /// Max participating-group count observed at the chosen size, for
    /// applications that report one.
    pub participating_groups: Option<u64>,
    /// (candidate size, mean kernel time) for every evaluated candidate.
    pub candidates: Vec<(u32, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SweepRecord {
    Occupancy(OccupancyRecord),
    Timing(TimingRecord),
    Tuning(TuningRecord),
}

/// A configuration that was skipped under the opt-in keep-going policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedConfiguration {
    pub configuration: String,
    pub reason: String,
}

/// Full result of one sweep run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub run_id: Uuid,
    pub run_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub device: DeviceProfile,
    pub iterations: usize,
    pub records: Vec<SweepRecord>,
    pub skipped: Vec<SkippedConfiguration>,
}

impl SweepReport {
    pub fn new(run_name: impl Into<String>, device: DeviceProfile, iterations: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_name: run_name.into(),
            started_at: Utc::now(),
            finished_at: None,
            device,
            iterations,
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn push(&mut self, record: SweepRecord) {
        self.records.push(record);
    }

    pub fn mark_skipped(&mut self, configuration: String, reason: String) {
        self.skipped.push(SkippedConfiguration {
            configuration,
            reason,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}
