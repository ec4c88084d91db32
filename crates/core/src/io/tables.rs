//! CSV reference tables
//!
//! - band table: `band,wavelength` (one row per stored band, in storage order)
//! - solar spectrum: `wavelength,irradiance` (nm, W·m⁻²·nm⁻¹)
//! - spectral library: `wavelength,<end member>,<end member>,...`

use crate::error::{Error, Result};
use crate::spectral::{SolarSpectrum, SpectralLibrary};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One row of a band table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandEntry {
    /// Physical band number
    pub band: u16,
    /// Centre wavelength in nm
    pub wavelength: f64,
}

#[derive(Debug, Deserialize)]
struct SolarRow {
    wavelength: f64,
    irradiance: f64,
}

#[derive(Debug, Serialize)]
struct DarkObjectRow {
    band: u16,
    wavelength: f64,
    dark: f64,
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(input)
}

/// Parse a `band,wavelength` table
pub fn parse_band_table<R: Read>(input: R) -> Result<Vec<BandEntry>> {
    let rows = reader(input)
        .deserialize()
        .collect::<std::result::Result<Vec<BandEntry>, _>>()?;
    if rows.is_empty() {
        return Err(Error::invalid("band_table", "empty", "no bands listed"));
    }
    Ok(rows)
}

pub fn read_band_table<P: AsRef<Path>>(path: P) -> Result<Vec<BandEntry>> {
    parse_band_table(File::open(path.as_ref())?)
}

/// Parse a `wavelength,irradiance` solar spectrum table
pub fn parse_solar_spectrum<R: Read>(input: R) -> Result<SolarSpectrum> {
    let rows = reader(input)
        .deserialize()
        .collect::<std::result::Result<Vec<SolarRow>, _>>()?;
    let (wavelengths, irradiance) = rows.into_iter().map(|r| (r.wavelength, r.irradiance)).unzip();
    SolarSpectrum::new(wavelengths, irradiance)
}

pub fn read_solar_spectrum<P: AsRef<Path>>(path: P) -> Result<SolarSpectrum> {
    parse_solar_spectrum(File::open(path.as_ref())?)
}

/// Parse a spectral library: first column wavelength, one column per end member
pub fn parse_spectral_library<R: Read>(input: R) -> Result<SpectralLibrary> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    if headers.len() < 2 {
        return Err(Error::invalid(
            "spectral_library",
            headers.len(),
            "expected a wavelength column and at least one end member column",
        ));
    }
    let names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut wavelengths = Vec::new();
    let mut values = Vec::new();
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record)? {
        let line = record.position().map_or(0, |p| p.line());
        let mut fields = record.iter().map(|f| {
            f.parse::<f64>()
                .map_err(|_| Error::invalid("spectral_library", f, format!("not a number on line {}", line)))
        });
        match fields.next() {
            Some(w) => wavelengths.push(w?),
            None => continue,
        }
        for v in fields {
            values.push(v?);
        }
    }

    let spectra = Array2::from_shape_vec((wavelengths.len(), names.len()), values)?
        .reversed_axes()
        .as_standard_layout()
        .into_owned();
    SpectralLibrary::new(names, wavelengths, spectra)
}

pub fn read_spectral_library<P: AsRef<Path>>(path: P) -> Result<SpectralLibrary> {
    parse_spectral_library(File::open(path.as_ref())?)
}

/// Write the dark-object vector as `band,wavelength,dark`
pub fn write_dark_objects<P: AsRef<Path>>(
    path: P,
    labels: &[u16],
    wavelengths: &[f64],
    dark: &[f64],
) -> Result<()> {
    if labels.len() != dark.len() || wavelengths.len() != dark.len() {
        return Err(Error::invalid(
            "dark",
            dark.len(),
            format!("expected {} values, one per band", labels.len()),
        ));
    }
    let mut wtr = Writer::from_path(path.as_ref())?;
    for ((&band, &wavelength), &dark) in labels.iter().zip(wavelengths).zip(dark) {
        wtr.serialize(DarkObjectRow { band, wavelength, dark })?;
    }
    wtr.flush()?;
    Ok(())
}
