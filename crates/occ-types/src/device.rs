//! Device identity, queried once at startup and read-only thereafter.

use serde::{Deserialize, Serialize};

/// Facts reported by the device-query probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    pub vendor: String,
    pub local_memory_bytes: u64,
    pub max_workgroup_size: u32,
    pub compute_unit_count: u32,
}

/// Headroom subtracted from the device local-memory limit when probing
/// under maximum memory pressure; allocating the full reported size is
/// rejected by several drivers.
pub const LOCAL_MEM_HEADROOM_BYTES: u64 = 128;

impl DeviceProfile {
    /// Local-memory allocation for the given pressure setting.
    pub fn local_mem_for(&self, pressure: MemoryPressure) -> u64 {
        match pressure {
            MemoryPressure::Min => 1,
            MemoryPressure::Max => self
                .local_memory_bytes
                .saturating_sub(LOCAL_MEM_HEADROOM_BYTES)
                .max(1),
        }
    }

    /// Workgroup size for the given sizing setting.
    pub fn workgroup_size_for(&self, sizing: WorkgroupSizing) -> u32 {
        match sizing {
            WorkgroupSizing::Min => 1,
            WorkgroupSizing::Max => self.max_workgroup_size,
        }
    }

    /// Device name normalized for filesystem-safe report names.
    pub fn file_stem(&self) -> String {
        sanitize_file_stem(&self.name)
    }
}

/// Normalize a device or chip name for use as a report file stem:
/// carriage returns are stripped, whitespace and parentheses become
/// underscores.
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '\r')
        .map(|c| match c {
            ' ' | '(' | ')' => '_',
            other => other,
        })
        .collect()
}

/// Local-memory pressure axis of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryPressure {
    Min,
    Max,
}

impl MemoryPressure {
    pub const ALL: [MemoryPressure; 2] = [MemoryPressure::Min, MemoryPressure::Max];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Min => "min local memory",
            Self::Max => "max local memory",
        }
    }
}

/// Workgroup-size axis of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkgroupSizing {
    Min,
    Max,
}

impl WorkgroupSizing {
    pub const ALL: [WorkgroupSizing; 2] = [WorkgroupSizing::Min, WorkgroupSizing::Max];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Min => "min workgroup size",
            Self::Max => "max workgroup size",
        }
    }
}
