use thiserror::Error;

/// Main error type for the occupancy harness
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Sweep error: {0}")]
    Sweep(#[from] SweepError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while launching or supervising a probe process.
///
/// A launch failure is fatal for the whole run: it means the executable
/// itself is broken, which is a different condition from a probe that
/// merely runs past its deadline.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to launch `{command}`: {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}, stderr: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("`{command}` terminated by signal before the deadline")]
    KilledBySignal { command: String },

    #[error("Failed waiting on child for `{command}`: {source}")]
    WaitFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe stdout was not valid UTF-8 for `{command}`")]
    BadEncoding { command: String },
}

/// Typed failure from the output extractor.
///
/// These never abort a run on their own; the aggregator decides whether a
/// malformed probe output is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Expected exactly one `{label}` field, found none")]
    MissingField { label: String },

    #[error("Expected exactly one `{label}` field, found {count}")]
    AmbiguousField { label: String, count: usize },

    #[error("Field `{label}` carried unparseable number `{token}`")]
    BadNumber { label: String, token: String },
}

/// Sweep-level failures.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration `{configuration}` failed after {attempts} attempts: {reason}")]
    ConfigurationFailure {
        configuration: String,
        attempts: usize,
        reason: String,
    },

    #[error("Device query produced unusable output: {message}")]
    DeviceQueryFailed { message: String },

    #[error("Report writing failed: {message}")]
    ReportFailed { message: String },
}

/// Result type alias for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::HarnessError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ProbeError::NonZeroExit {
            command: "occupancy_test 64 256 1 0 0".to_string(),
            code: 2,
            stderr: "CL_OUT_OF_RESOURCES".to_string(),
        };

        assert!(error.to_string().contains("status 2"));
        assert!(error.to_string().contains("CL_OUT_OF_RESOURCES"));
    }

    #[test]
    fn test_error_conversion() {
        let extract_error = ExtractError::MissingField {
            label: "kernel time:".to_string(),
        };
        let harness_error: HarnessError = extract_error.into();

        match harness_error {
            HarnessError::Extract(_) => (),
            _ => panic!("Expected Extract error"),
        }
    }

    #[test]
    fn test_macros() {
        let _config_err = config_error!("Missing required argument: {}", "exe_path");
    }
}
