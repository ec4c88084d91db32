//! Linear resampling of wavelength-indexed tables

use crate::error::{Error, Result};

/// Tolerance (nm) under which two wavelength grids are treated as identical
pub const WAVELENGTH_TOLERANCE: f64 = 1e-6;

/// Check that a wavelength vector is non-empty, finite and strictly increasing
pub fn validate_wavelengths(name: &'static str, wavelengths: &[f64]) -> Result<()> {
    if wavelengths.is_empty() {
        return Err(Error::invalid(name, "[]", "at least one wavelength is required"));
    }
    if let Some(bad) = wavelengths.iter().find(|w| !w.is_finite()) {
        return Err(Error::invalid(name, bad, "wavelengths must be finite"));
    }
    if let Some(pair) = wavelengths.windows(2).find(|w| w[1] <= w[0]) {
        return Err(Error::invalid(
            name,
            format!("{} -> {}", pair[0], pair[1]),
            "wavelengths must be strictly increasing",
        ));
    }
    Ok(())
}

/// Whether two wavelength grids have the same length and matching values
pub fn same_grid(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= WAVELENGTH_TOLERANCE)
}

/// Piecewise-linear interpolation of `(xs, ys)` at `targets`.
///
/// `xs` must be strictly increasing. Targets outside `[xs[0], xs[n-1]]`
/// take the nearest end value.
pub fn interpolate(xs: &[f64], ys: &[f64], targets: &[f64]) -> Result<Vec<f64>> {
    if xs.len() != ys.len() {
        return Err(Error::SizeMismatch {
            er: xs.len(),
            ec: 1,
            ar: ys.len(),
            ac: 1,
        });
    }
    validate_wavelengths("xs", xs)?;

    let last = xs.len() - 1;
    let values = targets
        .iter()
        .map(|&t| {
            if t <= xs[0] {
                return ys[0];
            }
            if t >= xs[last] {
                return ys[last];
            }
            // First index with xs[i] > t; t lies in [xs[i-1], xs[i])
            let i = xs.partition_point(|&x| x <= t);
            let (x0, x1) = (xs[i - 1], xs[i]);
            let (y0, y1) = (ys[i - 1], ys[i]);
            y0 + (y1 - y0) * (t - x0) / (x1 - x0)
        })
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interpolate_inside_and_clamped() {
        let xs = [400.0, 500.0, 600.0];
        let ys = [1.0, 2.0, 4.0];
        let out = interpolate(&xs, &ys, &[350.0, 400.0, 450.0, 550.0, 600.0, 700.0]).unwrap();
        let expected = [1.0, 1.0, 1.5, 3.0, 4.0, 4.0];
        for (o, e) in out.iter().zip(expected) {
            assert_relative_eq!(*o, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_interpolate_exact_knots() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [10.0, 20.0, 30.0];
        assert_eq!(interpolate(&xs, &ys, &xs).unwrap(), ys.to_vec());
    }

    #[test]
    fn test_interpolate_rejects_unsorted() {
        assert!(interpolate(&[2.0, 1.0], &[0.0, 0.0], &[1.5]).is_err());
        assert!(interpolate(&[1.0, 2.0], &[0.0], &[1.5]).is_err());
    }

    #[test]
    fn test_same_grid() {
        assert!(same_grid(&[1.0, 2.0], &[1.0, 2.0 + 1e-9]));
        assert!(!same_grid(&[1.0, 2.0], &[1.0, 2.1]));
        assert!(!same_grid(&[1.0], &[1.0, 2.0]));
    }
}
