//! Hyperspectral cube GeoTIFF I/O
//!
//! A cube is stored either as one image directory per band (what
//! [`write_cube`] produces) or as a single directory with one interleaved
//! sample per band. Band labels and wavelengths are not part of the TIFF and
//! come from a band table (see [`read_band_table`](super::read_band_table)).

use crate::error::{Error, Result};
use crate::io::native::{decode_page, open_decoder, GeoTiffMeta};
use crate::io::tables::{read_band_table, BandEntry};
use crate::spectral::Cube;
use ndarray::{Array3, Axis};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tracing::debug;

/// Read a radiance cube and label its bands from a `band,wavelength` table
pub fn read_cube<P: AsRef<Path>, Q: AsRef<Path>>(image: P, band_table: Q) -> Result<Cube> {
    let bands = read_band_table(band_table)?;
    let file = BufReader::new(File::open(image.as_ref())?);
    decode_cube(file, &bands)
}

/// Read a cube from an in-memory GeoTIFF
pub fn read_cube_from_buffer(data: &[u8], bands: &[BandEntry]) -> Result<Cube> {
    decode_cube(Cursor::new(data), bands)
}

fn decode_cube<R: Read + Seek>(reader: R, bands: &[BandEntry]) -> Result<Cube> {
    let mut decoder = open_decoder(reader)?;
    let meta = GeoTiffMeta::read(&mut decoder);

    let mut layers: Vec<Vec<f64>> = Vec::new();
    let mut grid: Option<(usize, usize)> = None;
    loop {
        let page = decode_page(&mut decoder)?;
        match grid {
            None => grid = Some((page.rows, page.cols)),
            Some((rows, cols)) if (rows, cols) != (page.rows, page.cols) => {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: page.rows,
                    ac: page.cols,
                });
            }
            Some(_) => {}
        }
        // Split interleaved samples into separate bands
        for s in 0..page.samples {
            layers.push(page.data.iter().skip(s).step_by(page.samples).copied().collect());
        }
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let (rows, cols) = grid.unwrap_or((0, 0));
    if layers.len() != bands.len() {
        return Err(Error::invalid(
            "band_table",
            bands.len(),
            format!("image holds {} bands", layers.len()),
        ));
    }
    debug!("Decoded {} bands of {} x {}", layers.len(), cols, rows);

    let flat: Vec<f64> = layers.into_iter().flatten().collect();
    let data = Array3::from_shape_vec((bands.len(), rows, cols), flat)?;
    let cube = Cube::new(
        data,
        bands.iter().map(|b| b.band).collect(),
        bands.iter().map(|b| b.wavelength).collect(),
    )?;

    let crs = meta.crs();
    Ok(cube.with_georef(meta.transform.unwrap_or_default(), crs))
}

/// Write a cube as a multi-page 32-bit float GeoTIFF, one page per band
pub fn write_cube<P: AsRef<Path>>(cube: &Cube, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_cube(cube, file)
}

fn encode_cube<W: Write + Seek>(cube: &Cube, writer: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let mut meta = GeoTiffMeta::from_georef(cube.transform(), cube.crs());
    meta.nodata = Some(0.0);

    for band in cube.view().axis_iter(Axis(0)) {
        let data: Vec<f32> = band.iter().map(|&v| v as f32).collect();
        let mut image = encoder.new_image::<Gray32Float>(cube.cols() as u32, cube.rows() as u32)?;
        meta.write(image.encoder())?;
        image.write_data(&data)?;
    }
    Ok(())
}
