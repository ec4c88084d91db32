//! Hyperspectral cube and band-label index

use std::collections::HashMap;

use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use crate::spectral::resample::validate_wavelengths;

/// Mapping from physical band label to position in the cube.
///
/// Sensors often ship without their lowest or noisiest bands, so band
/// `8` may well sit at array position `0`. All lookups by label go through
/// this index.
#[derive(Debug, Clone, PartialEq)]
pub struct BandIndex {
    labels: Vec<u16>,
    positions: HashMap<u16, usize>,
}

impl BandIndex {
    /// Build an index from labels in storage order. Labels must be unique.
    pub fn new(labels: Vec<u16>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::invalid("labels", "[]", "a cube needs at least one band"));
        }
        let mut positions = HashMap::with_capacity(labels.len());
        for (i, &label) in labels.iter().enumerate() {
            if positions.insert(label, i).is_some() {
                return Err(Error::invalid("labels", label, "duplicate band label"));
            }
        }
        Ok(Self { labels, positions })
    }

    /// Array position of a band label
    pub fn position(&self, label: u16) -> Result<usize> {
        self.positions
            .get(&label)
            .copied()
            .ok_or(Error::UnknownBand(label))
    }

    /// Labels in storage order
    pub fn labels(&self) -> &[u16] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A georeferenced hyperspectral cube.
///
/// Values are stored band × row × column. A value of `0` marks a pixel
/// without data; percentile statistics skip negative values as well. Every
/// band shares the same grid, wavelengths are strictly increasing and
/// aligned index-for-index with the band labels.
#[derive(Debug, Clone)]
pub struct Cube {
    data: Array3<f64>,
    bands: BandIndex,
    wavelengths: Vec<f64>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl Cube {
    /// Create a cube from band × row × column data.
    ///
    /// Fails when labels or wavelengths do not line up with the band axis,
    /// when wavelengths are not strictly increasing, or when any value is
    /// non-finite. Negative values are kept; statistics treat them as no-data.
    pub fn new(data: Array3<f64>, labels: Vec<u16>, wavelengths: Vec<f64>) -> Result<Self> {
        let bands = BandIndex::new(labels)?;
        let n_bands = data.len_of(Axis(0));
        if bands.len() != n_bands {
            return Err(Error::invalid(
                "labels",
                bands.len(),
                format!("cube has {} bands", n_bands),
            ));
        }
        if wavelengths.len() != n_bands {
            return Err(Error::invalid(
                "wavelengths",
                wavelengths.len(),
                format!("cube has {} bands", n_bands),
            ));
        }
        validate_wavelengths("wavelengths", &wavelengths)?;
        if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
            return Err(Error::invalid("data", bad, "cube values must be finite"));
        }

        Ok(Self {
            data,
            bands,
            wavelengths,
            transform: GeoTransform::default(),
            crs: None,
        })
    }

    /// Stack individual 2D bands into a cube. All bands must share one shape.
    pub fn from_bands(bands: Vec<Array2<f64>>, labels: Vec<u16>, wavelengths: Vec<f64>) -> Result<Self> {
        let (rows, cols) = bands.first().map(|b| b.dim()).ok_or_else(|| {
            Error::invalid("bands", "[]", "a cube needs at least one band")
        })?;
        if let Some(b) = bands.iter().find(|b| b.dim() != (rows, cols)) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: b.nrows(),
                ac: b.ncols(),
            });
        }
        let mut data = Array3::zeros((bands.len(), rows, cols));
        for (mut slot, band) in data.outer_iter_mut().zip(&bands) {
            slot.assign(band);
        }
        Self::new(data, labels, wavelengths)
    }

    /// Attach georeferencing, consuming and returning the cube
    pub fn with_georef(mut self, transform: GeoTransform, crs: Option<CRS>) -> Self {
        self.transform = transform;
        self.crs = crs;
        self
    }

    /// A new cube with the same bands and georeferencing but different values
    pub fn with_data(&self, data: Array3<f64>) -> Result<Self> {
        if data.dim() != self.data.dim() {
            let (_, rows, cols) = self.data.dim();
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: data.len_of(Axis(1)),
                ac: data.len_of(Axis(2)),
            });
        }
        Ok(Self::new(data, self.bands.labels().to_vec(), self.wavelengths.clone())?
            .with_georef(self.transform, self.crs.clone()))
    }

    // Dimensions

    pub fn n_bands(&self) -> usize {
        self.bands.len()
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Dimensions as (bands, rows, cols)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    // Band access

    /// Band by physical label
    pub fn band(&self, label: u16) -> Result<ArrayView2<'_, f64>> {
        let i = self.bands.position(label)?;
        Ok(self.data.index_axis(Axis(0), i))
    }

    /// Band by array position
    pub fn band_at(&self, position: usize) -> Option<ArrayView2<'_, f64>> {
        (position < self.n_bands()).then(|| self.data.index_axis(Axis(0), position))
    }

    /// Band by label as a georeferenced raster with no-data `0`
    pub fn band_raster(&self, label: u16) -> Result<Raster<f64>> {
        let mut raster = Raster::from_array(self.band(label)?.to_owned())
            .with_georef(self.transform, self.crs.clone());
        raster.set_nodata(Some(0.0));
        Ok(raster)
    }

    /// Wavelength (nm) of a band label
    pub fn wavelength(&self, label: u16) -> Result<f64> {
        Ok(self.wavelengths[self.bands.position(label)?])
    }

    /// Label of the band whose wavelength is closest to `nm`
    pub fn nearest_band(&self, nm: f64) -> u16 {
        let best = self
            .wavelengths
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - nm).abs().total_cmp(&(b.1 - nm).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.bands.labels()[best]
    }

    /// Spectrum of one pixel across all bands
    pub fn spectrum(&self, row: usize, col: usize) -> Result<Array1<f64>> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(self.data.slice(ndarray::s![.., row, col]).to_owned())
    }

    /// Pixels whose value in band `label` is zero
    pub fn nodata_mask(&self, label: u16) -> Result<Array2<bool>> {
        Ok(self.band(label)?.mapv(|v| v == 0.0))
    }

    /// Copy of the data in row × column × band order
    pub fn to_pixel_major(&self) -> Array3<f64> {
        self.data
            .view()
            .permuted_axes([1, 2, 0])
            .as_standard_layout()
            .into_owned()
    }

    // Metadata

    pub fn labels(&self) -> &[u16] {
        self.bands.labels()
    }

    pub fn band_index(&self) -> &BandIndex {
        &self.bands
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }
}
