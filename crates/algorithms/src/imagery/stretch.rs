//! Percentile contrast stretch for display
//!
//! Maps a band to [0, 1]: the `pmin`th percentile of the positive values
//! becomes 0, the `pmax`th becomes 1, linear in between, clamped outside.
//! No-data (≤ 0) values are left out of the percentiles but pass through the
//! same transform, so they clamp to 0.

use crate::maybe_rayon::*;
use crate::statistics::{positive_percentiles, validate_percentile};
use hypersam_core::raster::Raster;
use hypersam_core::{Algorithm, Cube, Error, Result};
use ndarray::{Array2, Array3, ArrayView2, ArrayViewD, Axis, Ix2};
use serde::{Deserialize, Serialize};

/// Percentile bounds of the stretch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretchParams {
    /// Percentile mapped to 0 (default: 2)
    pub pmin: f64,
    /// Percentile mapped to 1 (default: 98)
    pub pmax: f64,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self { pmin: 2.0, pmax: 98.0 }
    }
}

impl StretchParams {
    pub fn validate(&self) -> Result<()> {
        validate_percentile("pmin", self.pmin)?;
        validate_percentile("pmax", self.pmax)?;
        if self.pmin >= self.pmax {
            return Err(Error::invalid(
                "pmin",
                self.pmin,
                format!("must be less than pmax ({})", self.pmax),
            ));
        }
        Ok(())
    }
}

/// Percentile stretch algorithm
#[derive(Debug, Clone, Default)]
pub struct PercentileStretch;

impl Algorithm for PercentileStretch {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = StretchParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PercentileStretch"
    }

    fn description(&self) -> &'static str {
        "Linear contrast stretch of a band between two percentiles of its positive values"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        stretch_raster(&input, params)
    }
}

/// Stretch a 2-D image to [0, 1] between its `pmin`th and `pmax`th percentiles.
///
/// # Errors
/// - `InvalidDimensions` unless the input is exactly 2-D
/// - `InvalidParameter` for percentiles outside [0, 100] or `pmin >= pmax`
/// - `NoValidPixels` when the image has no positive values
pub fn percentile_stretch(image: ArrayViewD<'_, f64>, pmin: f64, pmax: f64) -> Result<Array2<f64>> {
    let ndim = image.ndim();
    let image = image
        .into_dimensionality::<Ix2>()
        .map_err(|_| Error::InvalidDimensions { expected: 2, actual: ndim })?;
    stretch_band(image, StretchParams { pmin, pmax })
}

fn stretch_band(image: ArrayView2<'_, f64>, params: StretchParams) -> Result<Array2<f64>> {
    params.validate()?;

    let bounds = positive_percentiles(image.iter().copied(), &[params.pmin, params.pmax])?;
    let (lo, hi) = match bounds.as_deref() {
        Some(&[lo, hi]) => (lo, hi),
        _ => return Err(Error::NoValidPixels),
    };
    let span = hi - lo;

    let (rows, cols) = image.dim();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0.0; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = image[[row, col]];
                if v.is_nan() {
                    continue;
                }
                *out = if span > 0.0 {
                    ((v - lo) / span).clamp(0.0, 1.0)
                } else if v > lo {
                    1.0
                } else {
                    0.0
                };
            }
            row_data
        })
        .collect();

    Ok(Array2::from_shape_vec((rows, cols), data)?)
}

/// Stretch a georeferenced band, keeping its transform and CRS.
///
/// The output has no no-data value: every pixel is in [0, 1].
pub fn stretch_raster(raster: &Raster<f64>, params: StretchParams) -> Result<Raster<f64>> {
    let stretched = stretch_band(raster.view(), params)?;
    let mut output = raster.with_same_meta::<f64>(stretched)?;
    output.set_nodata(None);
    Ok(output)
}

/// Three bands stretched independently into a rows × cols × 3 composite.
///
/// `bands` are band labels in red, green, blue order.
pub fn rgb_composite(cube: &Cube, bands: [u16; 3], params: StretchParams) -> Result<Array3<f64>> {
    let mut composite = Array3::zeros((cube.rows(), cube.cols(), 3));
    for (channel, &label) in bands.iter().enumerate() {
        let stretched = stretch_band(cube.band(label)?, params)?;
        composite.index_axis_mut(Axis(2), channel).assign(&stretched);
    }
    Ok(composite)
}
