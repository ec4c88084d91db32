//! Spectral angle classification of a reflectance cube

use crate::spectral::sam::{spectral_angles, AngleMap, NODATA_CLASS};
use hypersam_core::raster::Raster;
use hypersam_core::{Algorithm, Cube, Error, Result, SpectralLibrary};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for spectral angle classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamParams {
    /// Band whose zero radiance marks no-data (default: the first band)
    pub nodata_band: Option<u16>,
}

/// Inputs of spectral angle classification
#[derive(Debug, Clone)]
pub struct SamInput {
    pub reflectance: Cube,
    pub library: SpectralLibrary,
    /// Cube the no-data mask is read from, usually the radiance
    pub nodata_source: Cube,
}

/// Spectral Angle Mapper classifier
#[derive(Debug, Clone, Default)]
pub struct SpectralAngleMapper;

impl Algorithm for SpectralAngleMapper {
    type Input = SamInput;
    type Output = Raster<u8>;
    type Params = SamParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SpectralAngleMapper"
    }

    fn description(&self) -> &'static str {
        "Classify each pixel to the end member with the smallest spectral angle"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let nodata_band = params
            .nodata_band
            .unwrap_or(input.nodata_source.labels()[0]);
        sam_classify(&input.reflectance, &input.library, nodata_band, &input.nodata_source)
    }
}

/// Angles of every reflectance pixel to every library spectrum.
///
/// The library is resampled onto the cube's wavelengths first.
pub fn sam_angles(reflectance: &Cube, library: &SpectralLibrary) -> Result<AngleMap> {
    let aligned = library.align_to(reflectance.wavelengths())?;
    let field = reflectance.to_pixel_major();
    spectral_angles(field.view(), aligned.spectra())
}

/// Pixels left unclassified: zero radiance in `nodata_band` of
/// `nodata_source`, or an all-zero reflectance spectrum.
pub fn classification_mask(reflectance: &Cube, nodata_band: u16, nodata_source: &Cube) -> Result<Array2<bool>> {
    if (nodata_source.rows(), nodata_source.cols()) != (reflectance.rows(), reflectance.cols()) {
        return Err(Error::SizeMismatch {
            er: reflectance.rows(),
            ec: reflectance.cols(),
            ar: nodata_source.rows(),
            ac: nodata_source.cols(),
        });
    }
    let mut mask = nodata_source.nodata_mask(nodata_band)?;
    let zero_spectrum = reflectance
        .view()
        .map_axis(Axis(0), |spectrum| spectrum.iter().all(|&v| v == 0.0));
    mask.zip_mut_with(&zero_spectrum, |m, &z| *m |= z);
    Ok(mask)
}

pub(crate) fn classify_with_angles(
    reflectance: &Cube,
    library: &SpectralLibrary,
    nodata_band: u16,
    nodata_source: &Cube,
) -> Result<(AngleMap, Raster<u8>)> {
    if library.len() > NODATA_CLASS as usize {
        return Err(Error::invalid(
            "library",
            library.len(),
            format!("at most {} end members fit an 8-bit classification", NODATA_CLASS),
        ));
    }
    let mask = classification_mask(reflectance, nodata_band, nodata_source)?;
    let angles = sam_angles(reflectance, library)?;
    let labels = angles.best_match(Some(mask.view()))?;
    debug!(
        "SAM against {} end members, {} of {} pixels unclassified",
        library.len(),
        mask.iter().filter(|&&m| m).count(),
        mask.len()
    );

    let mut classes = Raster::from_array(labels)
        .with_georef(*reflectance.transform(), reflectance.crs().cloned());
    classes.set_nodata(Some(NODATA_CLASS));
    Ok((angles, classes))
}

/// Classify a reflectance cube against a spectral library.
///
/// Each pixel gets the index (in library order) of the end member with the
/// smallest spectral angle. Pixels with zero radiance in `nodata_band` of
/// `nodata_source`, and pixels whose reflectance is all zero, get
/// [`NODATA_CLASS`]. The result carries the cube's georeferencing.
pub fn sam_classify(
    reflectance: &Cube,
    library: &SpectralLibrary,
    nodata_band: u16,
    nodata_source: &Cube,
) -> Result<Raster<u8>> {
    classify_with_angles(reflectance, library, nodata_band, nodata_source).map(|(_, classes)| classes)
}
