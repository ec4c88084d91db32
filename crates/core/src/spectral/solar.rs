//! Extraterrestrial solar irradiance table

use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::spectral::resample::{interpolate, validate_wavelengths};

/// Solar spectral irradiance at the top of the atmosphere.
///
/// Stored as published: wavelength in nm, irradiance in W·m⁻²·nm⁻¹.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarSpectrum {
    wavelengths: Vec<f64>,
    irradiance: Vec<f64>,
}

impl SolarSpectrum {
    pub fn new(wavelengths: Vec<f64>, irradiance: Vec<f64>) -> Result<Self> {
        if wavelengths.len() != irradiance.len() {
            return Err(Error::invalid(
                "irradiance",
                irradiance.len(),
                format!("expected {} values, one per wavelength", wavelengths.len()),
            ));
        }
        validate_wavelengths("wavelengths", &wavelengths)?;
        if let Some(bad) = irradiance.iter().find(|e| !e.is_finite() || **e < 0.0) {
            return Err(Error::invalid(
                "irradiance",
                bad,
                "irradiance must be finite and non-negative",
            ));
        }
        Ok(Self {
            wavelengths,
            irradiance,
        })
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn irradiance(&self) -> &[f64] {
        &self.irradiance
    }

    /// Table irradiance (W·m⁻²·nm⁻¹) linearly interpolated at `wavelengths`
    pub fn resample(&self, wavelengths: &[f64]) -> Result<Vec<f64>> {
        interpolate(&self.wavelengths, &self.irradiance, wavelengths)
    }

    /// Irradiance at each band wavelength in W·m⁻²·sr⁻¹·µm⁻¹,
    /// the units the COST correction expects.
    pub fn band_irradiance(&self, wavelengths: &[f64]) -> Result<Vec<f64>> {
        Ok(self
            .resample(wavelengths)?
            .into_iter()
            .map(to_radiance_units)
            .collect())
    }
}

/// W·m⁻²·nm⁻¹ → W·m⁻²·sr⁻¹·µm⁻¹ (×1000 per µm, ÷4π per steradian)
pub fn to_radiance_units(irradiance_per_nm: f64) -> f64 {
    irradiance_per_nm * 1000.0 / (4.0 * PI)
}
