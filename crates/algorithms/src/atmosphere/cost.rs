//! COST surface reflectance (Chavez, 1996)
//!
//! ```text
//! ρ = π · (L − L_dark) · d² / (E_sun · cos²(θz))
//! ```
//!
//! where `L` is at-sensor radiance, `L_dark` the band's dark object, `d` the
//! Earth–Sun distance in AU, `E_sun` the band's exo-atmospheric irradiance
//! (W·m⁻²·sr⁻¹·µm⁻¹) and `θz` the solar zenith angle. The cos²(θz) term
//! approximates atmospheric transmittance by the cosine of the zenith angle.
//!
//! Pixels with zero radiance are no-data and stay 0. Other results below 0
//! are raised to [`NEGATIVE_REFLECTANCE_FLOOR`]. There is no upper clamp.

use crate::maybe_rayon::*;
use hypersam_core::{Algorithm, Cube, Error, Result};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use tracing::debug;

/// Reflectance assigned to valid pixels whose correction goes negative
pub const NEGATIVE_REFLECTANCE_FLOOR: f64 = 0.01;

/// Sun–target geometry of a scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneGeometry {
    /// Earth–Sun distance in astronomical units
    pub earth_sun_distance: f64,
    /// Solar zenith angle in radians
    pub solar_zenith: f64,
}

impl Default for SceneGeometry {
    fn default() -> Self {
        Self {
            earth_sun_distance: 1.0,
            solar_zenith: 0.0,
        }
    }
}

impl SceneGeometry {
    /// Scene geometry from an Earth–Sun distance (AU) and a solar zenith (radians)
    pub fn new(earth_sun_distance: f64, solar_zenith: f64) -> Result<Self> {
        let scene = Self {
            earth_sun_distance,
            solar_zenith,
        };
        scene.validate()?;
        Ok(scene)
    }

    /// Scene geometry from a sun elevation in degrees (zenith = 90° − elevation)
    pub fn from_sun_elevation(earth_sun_distance: f64, sun_elevation_deg: f64) -> Result<Self> {
        if !sun_elevation_deg.is_finite() || sun_elevation_deg <= 0.0 || sun_elevation_deg > 90.0 {
            return Err(Error::invalid(
                "sun_elevation",
                sun_elevation_deg,
                "must be in (0, 90] degrees",
            ));
        }
        Self::new(earth_sun_distance, (90.0 - sun_elevation_deg).to_radians())
    }

    /// Sun elevation in degrees
    pub fn sun_elevation(&self) -> f64 {
        90.0 - self.solar_zenith.to_degrees()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.earth_sun_distance.is_finite() || self.earth_sun_distance <= 0.0 {
            return Err(Error::invalid(
                "earth_sun_distance",
                self.earth_sun_distance,
                "must be a positive number of AU",
            ));
        }
        if !self.solar_zenith.is_finite() || self.solar_zenith < 0.0 || self.solar_zenith >= FRAC_PI_2 {
            return Err(Error::invalid(
                "solar_zenith",
                self.solar_zenith,
                "must be in [0, π/2) radians",
            ));
        }
        Ok(())
    }

    /// d² · π / cos²(θz), the per-scene factor of the correction
    fn scale(&self) -> f64 {
        let cos_z = self.solar_zenith.cos();
        self.earth_sun_distance.powi(2) * PI / (cos_z * cos_z)
    }
}

/// Inputs of the COST correction
#[derive(Debug, Clone)]
pub struct CostInput {
    /// At-sensor radiance cube
    pub radiance: Cube,
    /// Dark object per band
    pub dark: Vec<f64>,
    /// Exo-atmospheric irradiance per band (W·m⁻²·sr⁻¹·µm⁻¹)
    pub irradiance: Vec<f64>,
}

/// COST reflectance correction algorithm
#[derive(Debug, Clone, Default)]
pub struct CostCorrection;

impl Algorithm for CostCorrection {
    type Input = CostInput;
    type Output = Cube;
    type Params = SceneGeometry;
    type Error = Error;

    fn name(&self) -> &'static str {
        "CostCorrection"
    }

    fn description(&self) -> &'static str {
        "Convert at-sensor radiance to surface reflectance with dark-object subtraction and the COST transmittance model"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        cost_reflectance(&input.radiance, &input.dark, &input.irradiance, &params)
    }
}

/// COST reflectance of one band.
///
/// Assumes a validated scene and a positive irradiance.
pub fn cost_reflectance_band(
    radiance: ArrayView2<'_, f64>,
    dark: f64,
    irradiance: f64,
    scene: &SceneGeometry,
) -> Array2<f64> {
    let factor = scene.scale() / irradiance;
    radiance.mapv(|l| {
        if l == 0.0 {
            return 0.0;
        }
        let rho = (l - dark) * factor;
        if rho < 0.0 {
            NEGATIVE_REFLECTANCE_FLOOR
        } else {
            rho
        }
    })
}

/// COST reflectance of every band of a radiance cube.
///
/// The result keeps the cube's labels, wavelengths and georeferencing.
///
/// # Errors
/// `InvalidParameter` when the scene is invalid, when `dark` or `irradiance`
/// do not hold one value per band, or when an irradiance is not positive.
pub fn cost_reflectance(
    radiance: &Cube,
    dark: &[f64],
    irradiance: &[f64],
    scene: &SceneGeometry,
) -> Result<Cube> {
    scene.validate()?;
    let n_bands = radiance.n_bands();
    if dark.len() != n_bands {
        return Err(Error::invalid(
            "dark",
            dark.len(),
            format!("expected one value per band ({})", n_bands),
        ));
    }
    if irradiance.len() != n_bands {
        return Err(Error::invalid(
            "irradiance",
            irradiance.len(),
            format!("expected one value per band ({})", n_bands),
        ));
    }
    if let Some(bad) = dark.iter().find(|d| !d.is_finite()) {
        return Err(Error::invalid("dark", bad, "must be finite"));
    }
    if let Some(bad) = irradiance.iter().find(|e| !e.is_finite() || **e <= 0.0) {
        return Err(Error::invalid("irradiance", bad, "must be positive"));
    }

    let view = radiance.view();
    let bands: Vec<Array2<f64>> = (0..n_bands)
        .into_par_iter()
        .map(|i| cost_reflectance_band(view.index_axis(Axis(0), i), dark[i], irradiance[i], scene))
        .collect();

    let views: Vec<ArrayView2<'_, f64>> = bands.iter().map(|b| b.view()).collect();
    let stacked = ndarray::stack(Axis(0), &views)?;
    debug!(
        "COST reflectance for {} bands (d = {} AU, sun elevation {:.2}°)",
        n_bands,
        scene.earth_sun_distance,
        scene.sun_elevation()
    );
    radiance.with_data(stacked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn cube() -> Cube {
        Cube::from_bands(
            vec![array![[10.0, 20.0], [0.0, 30.0]], array![[4.0, 1.0], [0.0, 8.0]]],
            vec![8, 9],
            vec![426.82, 436.99],
        )
        .unwrap()
    }

    #[test]
    fn test_scene_from_elevation() {
        let scene = SceneGeometry::from_sun_elevation(1.0, 30.0).unwrap();
        assert_relative_eq!(scene.solar_zenith, 60.0_f64.to_radians(), epsilon = 1e-12);
        assert_relative_eq!(scene.sun_elevation(), 30.0, epsilon = 1e-9);
        assert!(SceneGeometry::from_sun_elevation(1.0, 0.0).is_err());
        assert!(SceneGeometry::from_sun_elevation(1.0, 91.0).is_err());
        assert!(SceneGeometry::new(0.0, 0.1).is_err());
        assert!(SceneGeometry::new(1.0, FRAC_PI_2).is_err());
    }

    #[test]
    fn test_band_formula() {
        let scene = SceneGeometry::new(1.0, 0.0).unwrap();
        let band = array![[10.0, 20.0], [0.0, 30.0]];
        let rho = cost_reflectance_band(band.view(), 10.0, PI, &scene);
        // (L - 10) · π / π
        assert_eq!(rho[[0, 0]], 0.0);
        assert_relative_eq!(rho[[0, 1]], 10.0);
        assert_eq!(rho[[1, 0]], 0.0);
        assert_relative_eq!(rho[[1, 1]], 20.0);
    }

    #[test]
    fn test_distance_and_zenith() {
        let scene = SceneGeometry::new(2.0, 60.0_f64.to_radians()).unwrap();
        let band = array![[2.0]];
        let rho = cost_reflectance_band(band.view(), 1.0, 1.0, &scene);
        // 1 · 4 · π / 0.25
        assert_relative_eq!(rho[[0, 0]], 16.0 * PI, epsilon = 1e-9);
    }

    #[test]
    fn test_negative_clamped_to_floor() {
        let scene = SceneGeometry::default();
        let band = array![[1.0, 5.0]];
        let rho = cost_reflectance_band(band.view(), 3.0, 1.0, &scene);
        assert_eq!(rho[[0, 0]], NEGATIVE_REFLECTANCE_FLOOR);
        assert!(rho[[0, 1]] > 0.0);
    }

    #[test]
    fn test_cube_correction() {
        let scene = SceneGeometry::from_sun_elevation(1.014, 45.0).unwrap();
        let radiance = cube();
        let refl = cost_reflectance(&radiance, &[10.0, 2.0], &[150.0, 160.0], &scene).unwrap();
        assert_eq!(refl.dim(), radiance.dim());
        assert_eq!(refl.labels(), radiance.labels());
        assert!(refl.view().iter().all(|&v| v >= 0.0));
        // no-data stays no-data in every band
        assert_eq!(refl.band(8).unwrap()[[1, 0]], 0.0);
        assert_eq!(refl.band(9).unwrap()[[1, 0]], 0.0);
        // radiance equal to the dark object gives exactly 0
        assert_eq!(refl.band(8).unwrap()[[0, 0]], 0.0);
        // below the dark object: floor
        assert_eq!(refl.band(9).unwrap()[[0, 1]], NEGATIVE_REFLECTANCE_FLOOR);
    }

    #[test]
    fn test_length_and_irradiance_checks() {
        let scene = SceneGeometry::default();
        let radiance = cube();
        assert!(cost_reflectance(&radiance, &[1.0], &[1.0, 1.0], &scene).is_err());
        assert!(cost_reflectance(&radiance, &[1.0, 1.0], &[1.0], &scene).is_err());
        assert!(matches!(
            cost_reflectance(&radiance, &[1.0, 1.0], &[1.0, 0.0], &scene),
            Err(Error::InvalidParameter { name: "irradiance", .. })
        ));
        let bad_scene = SceneGeometry {
            earth_sun_distance: -1.0,
            solar_zenith: 0.0,
        };
        assert!(cost_reflectance(&radiance, &[1.0, 1.0], &[1.0, 1.0], &bad_scene).is_err());
    }

    #[test]
    fn test_algorithm_trait() {
        let input = CostInput {
            radiance: cube(),
            dark: vec![0.0, 0.0],
            irradiance: vec![PI, PI],
        };
        let refl = CostCorrection.execute_default(input).unwrap();
        assert_relative_eq!(refl.band(8).unwrap()[[1, 1]], 30.0);
    }
}
