//! Marker-based extraction of numeric facts from probe stdout.
//!
//! Probes report results as plain text lines with fixed label prefixes
//! followed by a numeric literal. Extraction requires exactly one match per
//! label: zero or multiple occurrences means the probe misbehaved and the
//! output is malformed, which is a typed failure rather than a crash so the
//! aggregator can decide whether to retry.

use occ_types::ExtractError;

/// Occupancy fact reported by the occupancy and timing probes.
pub const GROUPS_MARKER: &str = "kernel ran with a total of";

/// Kernel time reported by the timing probe.
pub const KERNEL_TIME_MARKER: &str = "kernel time:";

/// Kernel time reported by the graph applications in the tuning sweep.
pub const KERNEL_TIME_EQ_MARKER: &str = "kernel time =";

/// Whole-application runtime reported by the ported graph applications.
pub const APP_RUNTIME_MARKER: &str = "app runtime =";

/// Group count reported alongside the app runtime by the ported graph
/// applications.
pub const PARTICIPATING_GROUPS_MARKER: &str = "number of participating groups =";

/// Extract the integer following the single occurrence of `label`.
pub fn extract_integer(text: &str, label: &str) -> Result<u64, ExtractError> {
    let token = labeled_token(text, label, |c: char| c.is_ascii_digit())?;
    token.parse::<u64>().map_err(|_| ExtractError::BadNumber {
        label: label.to_string(),
        token,
    })
}

/// Extract the decimal float following the single occurrence of `label`.
///
/// Standard decimal semantics only; no locale handling.
pub fn extract_float(text: &str, label: &str) -> Result<f64, ExtractError> {
    let token = labeled_token(text, label, |c: char| c.is_ascii_digit() || c == '.')?;
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ExtractError::BadNumber {
            label: label.to_string(),
            token,
        }),
    }
}

/// Find the numeric token after the unique occurrence of `label`.
fn labeled_token(
    text: &str,
    label: &str,
    accept: fn(char) -> bool,
) -> Result<String, ExtractError> {
    let positions: Vec<usize> = text.match_indices(label).map(|(i, _)| i).collect();
    match positions.len() {
        0 => Err(ExtractError::MissingField {
            label: label.to_string(),
        }),
        1 => {
            let rest = &text[positions[0] + label.len()..];
            let rest = rest.trim_start_matches(' ');
            let token: String = rest.chars().take_while(|c| accept(*c)).collect();
            if token.is_empty() {
                let preview: String = rest.chars().take(16).collect();
                return Err(ExtractError::BadNumber {
                    label: label.to_string(),
                    token: preview,
                });
            }
            Ok(token)
        }
        count => Err(ExtractError::AmbiguousField {
            label: label.to_string(),
            count,
        }),
    }
}
