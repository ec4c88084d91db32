//! Dark-object estimation
//!
//! The dark object of a band is a low percentile (0.5th by default) of its
//! positive radiance: an estimate of the path radiance added by the
//! atmosphere, which the COST correction subtracts.

use crate::maybe_rayon::*;
use crate::statistics::{percentile_of_sorted, sorted_positive, validate_percentile};
use hypersam_core::{Algorithm, Cube, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What to do with a band that has no positive values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyBandPolicy {
    /// Use 0 as the dark object and log a warning
    #[default]
    Zero,
    /// Fail with [`Error::EmptyBand`]
    Fail,
}

/// Parameters for dark-object estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DarkObjectParams {
    /// Percentile of positive values taken as the dark object (default: 0.5)
    pub percentile: f64,
    /// Handling of bands without valid pixels (default: zero)
    pub empty_band: EmptyBandPolicy,
}

impl Default for DarkObjectParams {
    fn default() -> Self {
        Self {
            percentile: 0.5,
            empty_band: EmptyBandPolicy::Zero,
        }
    }
}

/// Dark-object estimation algorithm
#[derive(Debug, Clone, Default)]
pub struct DarkObjectSubtraction;

impl Algorithm for DarkObjectSubtraction {
    type Input = Cube;
    type Output = Vec<f64>;
    type Params = DarkObjectParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "DarkObjectSubtraction"
    }

    fn description(&self) -> &'static str {
        "Estimate per-band dark-object radiance as a low percentile of positive values"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dark_object_values(&input, &params)
    }
}

/// Dark-object value of every band, in band order.
///
/// Each value lies between the minimum and maximum positive radiance of its
/// band.
///
/// # Errors
/// - `InvalidParameter` when the percentile is outside [0, 100]
/// - `EmptyBand` for a band without positive values under [`EmptyBandPolicy::Fail`]
pub fn dark_object_values(cube: &Cube, params: &DarkObjectParams) -> Result<Vec<f64>> {
    validate_percentile("percentile", params.percentile)?;

    let labels = cube.labels();
    let dark = (0..cube.n_bands())
        .into_par_iter()
        .map(|i| {
            let label = labels[i];
            let band = cube
                .band_at(i)
                .ok_or_else(|| Error::Other(format!("band position {} out of range", i)))?;
            let sorted = sorted_positive(band.iter().copied());
            match percentile_of_sorted(&sorted, params.percentile) {
                Some(value) => Ok(value),
                None => match params.empty_band {
                    EmptyBandPolicy::Zero => {
                        warn!("Band {} has no positive values, dark object set to 0", label);
                        Ok(0.0)
                    }
                    EmptyBandPolicy::Fail => Err(Error::EmptyBand { label }),
                },
            }
        })
        .collect::<Result<Vec<f64>>>()?;

    debug!(
        "Dark objects at the {} percentile for {} bands",
        params.percentile,
        dark.len()
    );
    Ok(dark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn cube() -> Cube {
        Cube::from_bands(
            vec![
                Array2::from_shape_fn((20, 20), |(r, c)| (r * 20 + c) as f64),
                Array2::from_elem((20, 20), 3.0),
                Array2::zeros((20, 20)),
            ],
            vec![8, 9, 12],
            vec![426.82, 436.99, 467.52],
        )
        .unwrap()
    }

    #[test]
    fn test_one_value_per_band() {
        let dark = dark_object_values(&cube(), &DarkObjectParams::default()).unwrap();
        assert_eq!(dark.len(), 3);
        assert!(dark.iter().all(|&d| d >= 0.0));
    }

    #[test]
    fn test_value_within_band_range() {
        let c = cube();
        let dark = dark_object_values(&c, &DarkObjectParams::default()).unwrap();
        // positive values are 1..=399; rank 398 * 0.005 = 1.99
        assert_relative_eq!(dark[0], 2.99, epsilon = 1e-9);
        assert_relative_eq!(dark[1], 3.0);
        for (i, &d) in dark.iter().take(2).enumerate() {
            let band = c.band_at(i).unwrap();
            let min = band.iter().copied().filter(|&v| v > 0.0).fold(f64::INFINITY, f64::min);
            let max = band.fold(0.0_f64, |m, &v| m.max(v));
            assert!(d >= min && d <= max, "band {}: {} outside [{}, {}]", i, d, min, max);
        }
    }

    #[test]
    fn test_empty_band_policies() {
        let c = cube();
        let dark = dark_object_values(&c, &DarkObjectParams::default()).unwrap();
        assert_eq!(dark[2], 0.0);

        let params = DarkObjectParams {
            empty_band: EmptyBandPolicy::Fail,
            ..Default::default()
        };
        assert!(matches!(
            dark_object_values(&c, &params),
            Err(Error::EmptyBand { label: 12 })
        ));
    }

    #[test]
    fn test_invalid_percentile() {
        let params = DarkObjectParams {
            percentile: 120.0,
            ..Default::default()
        };
        assert!(matches!(
            dark_object_values(&cube(), &params),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_algorithm_trait() {
        let dark = DarkObjectSubtraction.execute_default(cube()).unwrap();
        assert_eq!(dark.len(), 3);
        assert_eq!(DarkObjectSubtraction.name(), "DarkObjectSubtraction");
    }
}
