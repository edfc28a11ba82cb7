//! Summary statistics over trial samples.

use occ_types::Summary;

/// Summarize a sample set; `None` for an empty slice.
///
/// The standard deviation is the population form (divide by N, not N-1).
/// Every consumer of a [`Summary`] relies on that for comparability across
/// configurations.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(*v);
        max = max.max(*v);
    }
    Some(Summary {
        mean,
        min,
        max,
        stddev: variance.sqrt(),
        sample_count: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sample_statistics() {
        let summary = summarize(&[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(summary.mean, 4.0);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 6.0);
        assert_eq!(summary.sample_count, 3);
        // Population stddev: sqrt(8/3)
        assert!((summary.stddev - 1.632993161855452).abs() < 1e-12);
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let summary = summarize(&[5.5]).unwrap();
        assert_eq!(summary.mean, 5.5);
        assert_eq!(summary.stddev, 0.0);
        assert_eq!(summary.min, summary.max);
    }

    #[test]
    fn empty_sample_is_none() {
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn constant_samples_have_zero_stddev() {
        let summary = summarize(&[3.0, 3.0, 3.0, 3.0]).unwrap();
        assert_eq!(summary.stddev, 0.0);
        assert_eq!(summary.mean, 3.0);
    }
}
