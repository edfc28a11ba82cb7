//! Device query: one startup invocation of the `device_query` probe, parsed
//! into a read-only [`DeviceProfile`] shared by the rest of the run.

use std::path::Path;
use std::time::Duration;

use occ_types::{DeviceProfile, ExtractError, HarnessError, HarnessResult, ProbeError, SweepError};
use tracing::info;

use crate::extract::extract_integer;
use crate::runner::{BoundedRunner, RunResult};

const NAME_MARKER: &str = "DEVICE_NAME:";
const VENDOR_MARKER: &str = "DEVICE_VENDOR:";
const LOCAL_MEM_MARKER: &str = "DEVICE_LOCAL_MEM_SIZE:";
const MAX_WGS_MARKER: &str = "DEVICE_MAX_WORK_GROUP_SIZE:";
const COMPUTE_UNITS_MARKER: &str = "DEVICE_MAX_COMPUTE_UNITS:";

/// Device query gets a fixed generous deadline; a hung driver here means
/// nothing downstream can be trusted anyway.
const QUERY_DEADLINE: Duration = Duration::from_secs(60);

/// Run the device-query executable and parse its report.
pub fn query_device(
    runner: &dyn BoundedRunner,
    executable: &Path,
) -> HarnessResult<DeviceProfile> {
    let result = runner.run(executable, &[], QUERY_DEADLINE)?;
    let stdout = match result {
        RunResult::TimedOut => {
            return Err(SweepError::DeviceQueryFailed {
                message: format!("`{}` timed out", executable.display()),
            }
            .into())
        }
        RunResult::Completed {
            exit_code: 0,
            stdout,
            ..
        } => stdout,
        RunResult::Completed {
            exit_code, stderr, ..
        } => {
            return Err(ProbeError::NonZeroExit {
                command: executable.display().to_string(),
                code: exit_code,
                stderr,
            }
            .into())
        }
    };

    let profile = parse_device_report(&stdout)?;
    info!(
        device = %profile.name,
        vendor = %profile.vendor,
        local_mem = profile.local_memory_bytes,
        max_wgs = profile.max_workgroup_size,
        compute_units = profile.compute_unit_count,
        "queried device"
    );
    Ok(profile)
}

/// Parse the five `DEVICE_*` lines of a device-query report.
pub fn parse_device_report(stdout: &str) -> HarnessResult<DeviceProfile> {
    let max_workgroup_size = extract_integer(stdout, MAX_WGS_MARKER)?;
    let compute_unit_count = extract_integer(stdout, COMPUTE_UNITS_MARKER)?;
    Ok(DeviceProfile {
        name: line_suffix(stdout, NAME_MARKER)?,
        vendor: line_suffix(stdout, VENDOR_MARKER)?,
        local_memory_bytes: extract_integer(stdout, LOCAL_MEM_MARKER)?,
        max_workgroup_size: clamp_u32(max_workgroup_size, MAX_WGS_MARKER)?,
        compute_unit_count: clamp_u32(compute_unit_count, COMPUTE_UNITS_MARKER)?,
    })
}

/// The rest of the line after the unique occurrence of `label`.
fn line_suffix(text: &str, label: &str) -> HarnessResult<String> {
    let matches: Vec<&str> = text
        .lines()
        .filter_map(|line| line.split_once(label).map(|(_, rest)| rest.trim()))
        .collect();
    match matches.as_slice() {
        [] => Err(ExtractError::MissingField {
            label: label.to_string(),
        }
        .into()),
        [value] => Ok((*value).to_string()),
        many => Err(ExtractError::AmbiguousField {
            label: label.to_string(),
            count: many.len(),
        }
        .into()),
    }
}

fn clamp_u32(value: u64, label: &str) -> Result<u32, HarnessError> {
    u32::try_from(value).map_err(|_| {
        ExtractError::BadNumber {
            label: label.to_string(),
            token: value.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "DEVICE_NAME: Quadro K620\n\
                          DEVICE_VENDOR: NVIDIA Corporation\n\
                          DEVICE_LOCAL_MEM_SIZE: 49152\n\
                          DEVICE_MAX_WORK_GROUP_SIZE: 1024\n\
                          DEVICE_MAX_COMPUTE_UNITS: 3\n";

    #[test]
    fn parses_full_report() {
        let profile = parse_device_report(REPORT).unwrap();
        assert_eq!(profile.name, "Quadro K620");
        assert_eq!(profile.vendor, "NVIDIA Corporation");
        assert_eq!(profile.local_memory_bytes, 49152);
        assert_eq!(profile.max_workgroup_size, 1024);
        assert_eq!(profile.compute_unit_count, 3);
    }

    #[test]
    fn missing_line_is_an_error() {
        let truncated = REPORT.replace("DEVICE_VENDOR: NVIDIA Corporation\n", "");
        let err = parse_device_report(&truncated).unwrap_err();
        assert!(err.to_string().contains("DEVICE_VENDOR"));
    }

    #[test]
    fn duplicated_line_is_an_error() {
        let doubled = format!("{REPORT}DEVICE_NAME: Impostor\n");
        let err = parse_device_report(&doubled).unwrap_err();
        assert!(err.to_string().contains("DEVICE_NAME"));
    }

    #[test]
    #[cfg(unix)]
    fn queries_via_runner() {
        use crate::runner::default_runner;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device_query");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "#!/bin/sh\nprintf '{}'\n", REPORT.replace('\n', "\\n")).unwrap();
        let mut perms = file.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        drop(file);

        let runner = default_runner();
        let profile = query_device(runner.as_ref(), &path).unwrap();
        assert_eq!(profile.name, "Quadro K620");
    }
}
