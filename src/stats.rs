//! Robust baseline statistics: median, MAD and the robust z-score
//!
//! The baseline intentionally uses median/MAD instead of mean/stddev so the
//! effort spikes the detector is looking for do not inflate the very
//! reference they are measured against.

/// Rescales MAD to be comparable to a standard deviation under a
/// normal-distribution assumption.
const MAD_SCALE: f64 = 1.4826;

/// Below this scale the baseline is treated as having no variance.
const SCALE_FLOOR: f64 = 1e-9;

/// Sample median; averages the two middle values on even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Median and median absolute deviation of a value set.
///
/// Returns `(0.0, 0.0)` for an empty set; callers gate on a minimum sample
/// count before relying on the result.
pub fn median_mad(values: &[f64]) -> (f64, f64) {
    let med = match median(values) {
        Some(m) => m,
        None => return (0.0, 0.0),
    };

    let abs_dev: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    let mad = median(&abs_dev).unwrap_or(0.0);

    (med, mad)
}

/// Robust z-score of a single value against a median/MAD baseline.
///
/// Null values stay null. A degenerate baseline (no variance) maps every
/// value to exactly `0.0` instead of dividing by zero.
pub fn robust_z(value: Option<f64>, median: f64, mad: f64) -> Option<f64> {
    let v = value?;
    let scale = MAD_SCALE * mad;
    if scale <= SCALE_FLOOR {
        return Some(0.0);
    }
    Some((v - median) / scale)
}
