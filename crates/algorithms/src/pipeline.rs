//! Radiance-to-classification workflow
//!
//! dark objects → band irradiance → COST reflectance → SAM classification.
//! Every stage reads the previous stage's output and nothing is modified in
//! place, so intermediate products stay available to the caller.

use crate::atmosphere::{cost_reflectance, dark_object_values, DarkObjectParams, SceneGeometry};
use crate::spectral::{classify_with_angles, AngleMap};
use hypersam_core::raster::Raster;
use hypersam_core::{Cube, Result, SolarSpectrum, SpectralLibrary};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::info;

/// Parameters of the full workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub dark_object: DarkObjectParams,
    pub scene: SceneGeometry,
    /// End members to classify against, in this order (default: whole library)
    pub end_members: Option<Vec<String>>,
    /// Band whose zero radiance marks no-data (default: the first band)
    pub nodata_band: Option<u16>,
}

/// Products of the full workflow
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Dark object per band
    pub dark_objects: Vec<f64>,
    /// Exo-atmospheric irradiance per band (W·m⁻²·sr⁻¹·µm⁻¹)
    pub band_irradiance: Vec<f64>,
    pub reflectance: Cube,
    pub angles: AngleMap,
    /// Class index per pixel in end-member order, 255 for no-data
    pub classification: Raster<u8>,
    /// End members in class-index order
    pub end_members: Vec<String>,
}

/// Run the workflow on a radiance cube.
///
/// All parameters are checked before any stage runs.
pub fn run_pipeline(
    radiance: &Cube,
    solar: &SolarSpectrum,
    library: &SpectralLibrary,
    params: &PipelineParams,
) -> Result<PipelineOutput> {
    params.scene.validate()?;
    let nodata_band = params.nodata_band.unwrap_or(radiance.labels()[0]);
    radiance.band_index().position(nodata_band)?;
    let library = match &params.end_members {
        Some(names) => Cow::Owned(library.select(names)?),
        None => Cow::Borrowed(library),
    };

    let dark_objects = dark_object_values(radiance, &params.dark_object)?;
    info!("Dark objects estimated for {} bands", dark_objects.len());

    let band_irradiance = solar.band_irradiance(radiance.wavelengths())?;
    let reflectance = cost_reflectance(radiance, &dark_objects, &band_irradiance, &params.scene)?;
    info!("Reflectance computed");

    let (angles, classification) = classify_with_angles(&reflectance, &library, nodata_band, radiance)?;
    info!(
        "Classified {} x {} pixels against {} end members",
        classification.cols(),
        classification.rows(),
        library.len()
    );

    Ok(PipelineOutput {
        dark_objects,
        band_irradiance,
        reflectance,
        angles,
        classification,
        end_members: library.names().to_vec(),
    })
}
