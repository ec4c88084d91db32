//! Percentiles over the valid (strictly positive) values of a band
//!
//! Radiance of exactly zero marks no-data, so every percentile used by the
//! stretch and the dark-object estimator is taken over positive values only.
//! Percentiles interpolate linearly between the two closest ranks, placing
//! the `p`th percentile at fractional index `(n - 1) * p / 100` of the sorted
//! values.

use hypersam_core::{Error, Result};

/// Check that `p` is a finite percentage in [0, 100]
pub fn validate_percentile(name: &'static str, p: f64) -> Result<()> {
    if !p.is_finite() || !(0.0..=100.0).contains(&p) {
        return Err(Error::invalid(name, p, "must be a percentage in [0, 100]"));
    }
    Ok(())
}

/// Strictly positive, finite values sorted ascending
pub fn sorted_positive<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut valid: Vec<f64> = values
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    valid.sort_unstable_by(f64::total_cmp);
    valid
}

/// Linearly interpolated `p`th percentile of ascending `sorted` values.
///
/// Returns `None` for an empty slice. `p` is assumed to be in [0, 100].
pub fn percentile_of_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let rank = (n - 1) as f64 * p / 100.0;
    let lo = rank.floor() as usize;
    let hi = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Several percentiles of the positive values of `values`, in the order given.
///
/// Returns `Ok(None)` when there are no positive values.
pub fn positive_percentiles<I>(values: I, percentiles: &[f64]) -> Result<Option<Vec<f64>>>
where
    I: IntoIterator<Item = f64>,
{
    for &p in percentiles {
        validate_percentile("percentile", p)?;
    }
    let sorted = sorted_positive(values);
    if sorted.is_empty() {
        return Ok(None);
    }
    Ok(percentiles
        .iter()
        .map(|&p| percentile_of_sorted(&sorted, p))
        .collect())
}
