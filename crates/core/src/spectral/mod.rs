//! Hyperspectral data model
//!
//! - [`Cube`]: band × row × column radiance/reflectance addressed by band label
//! - [`BandIndex`]: validated band label → array position map
//! - [`SolarSpectrum`]: extraterrestrial irradiance table
//! - [`SpectralLibrary`]: named end-member reference spectra
//! - [`resample`]: linear wavelength resampling shared by the tables

mod cube;
mod library;
pub mod resample;
mod solar;

pub use cube::{BandIndex, Cube};
pub use library::SpectralLibrary;
pub use solar::SolarSpectrum;
