//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for TIFF I/O and handles the handful of GeoTIFF
//! tags the workflow needs: pixel scale, tiepoint, the GeoKey directory with
//! its parameter tags, and GDAL's no-data tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

// GeoTIFF and GDAL tags
pub(crate) const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
pub(crate) const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
pub(crate) const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
pub(crate) const GEO_DOUBLE_PARAMS: Tag = Tag::GeoDoubleParamsTag;
pub(crate) const GEO_ASCII_PARAMS: Tag = Tag::GeoAsciiParamsTag;
pub(crate) const GDAL_NODATA: Tag = Tag::GdalNodata;

/// Minimal GeoKey directory so other tools recognise the file as GeoTIFF:
/// GTModelTypeGeoKey = Projected, GTRasterTypeGeoKey = PixelIsArea.
const MINIMAL_GEOKEYS: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Value written to the GDAL_NODATA tag, if any
    pub nodata: Option<f64>,
}

/// Georeferencing tags carried from one GeoTIFF to another
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoTiffMeta {
    pub transform: Option<GeoTransform>,
    pub geokeys: Option<Vec<u16>>,
    pub geo_doubles: Option<Vec<f64>>,
    pub geo_ascii: Option<String>,
    pub nodata: Option<f64>,
}

impl GeoTiffMeta {
    /// Metadata for a grid we georeference ourselves
    pub fn from_georef(transform: &GeoTransform, crs: Option<&CRS>) -> Self {
        let geokeys = match crs.and_then(|c| c.epsg()) {
            Some(code) if code < u16::MAX as u32 => {
                // Geographic codes live in the 4000 range; everything else is projected
                let (model, key) = if (4000..5000).contains(&code) {
                    (2, 2048)
                } else {
                    (1, 3072)
                };
                vec![1, 1, 0, 3, 1024, 0, 1, model, 1025, 0, 1, 1, key, 0, 1, code as u16]
            }
            _ => MINIMAL_GEOKEYS.to_vec(),
        };
        Self {
            transform: Some(*transform),
            geokeys: Some(geokeys),
            ..Self::default()
        }
    }

    /// Read the georeferencing tags of the decoder's current image
    pub(crate) fn read<R: Read + Seek>(decoder: &mut Decoder<R>) -> Self {
        let transform = match (
            decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE),
            decoder.get_tag_f64_vec(MODEL_TIEPOINT),
        ) {
            (Ok(scale), Ok(tiepoint)) => GeoTransform::from_tiff_tags(&scale, &tiepoint),
            _ => None,
        };
        let nodata = decoder
            .get_tag_ascii_string(GDAL_NODATA)
            .ok()
            .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

        Self {
            transform,
            geokeys: decoder.get_tag_u16_vec(GEO_KEY_DIRECTORY).ok(),
            geo_doubles: decoder.get_tag_f64_vec(GEO_DOUBLE_PARAMS).ok(),
            geo_ascii: decoder.get_tag_ascii_string(GEO_ASCII_PARAMS).ok(),
            nodata,
        }
    }

    /// CRS declared by the GeoKey directory, if it names an EPSG code
    pub fn crs(&self) -> Option<CRS> {
        self.geokeys.as_deref().and_then(CRS::from_geokeys)
    }

    /// Write the tags into an image directory
    pub(crate) fn write<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<'_, W, K>,
    ) -> Result<()> {
        if let Some(gt) = &self.transform {
            dir.write_tag(MODEL_PIXEL_SCALE, &gt.pixel_scale()[..])?;
            dir.write_tag(MODEL_TIEPOINT, &gt.tiepoint()[..])?;
        }
        let geokeys = self.geokeys.as_deref().unwrap_or(&MINIMAL_GEOKEYS);
        dir.write_tag(GEO_KEY_DIRECTORY, geokeys)?;
        if let Some(doubles) = &self.geo_doubles {
            dir.write_tag(GEO_DOUBLE_PARAMS, doubles.as_slice())?;
        }
        if let Some(ascii) = &self.geo_ascii {
            dir.write_tag(GEO_ASCII_PARAMS, ascii.as_str())?;
        }
        if let Some(nodata) = self.nodata {
            dir.write_tag(GDAL_NODATA, format_nodata(nodata).as_str())?;
        }
        Ok(())
    }
}

fn format_nodata(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// One decoded image directory
pub(crate) struct DecodedPage {
    pub rows: usize,
    pub cols: usize,
    /// Samples per pixel, interleaved in `data`
    pub samples: usize,
    pub data: Vec<f64>,
}

pub(crate) fn open_decoder<R: Read + Seek>(reader: R) -> Result<Decoder<R>> {
    Ok(Decoder::new(reader)?.with_limits(Limits::unlimited()))
}

/// Decode the decoder's current image into f64 samples
pub(crate) fn decode_page<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<DecodedPage> {
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<f64> = match decoder.read_image()? {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let pixels = rows * cols;
    if pixels == 0 || data.len() % pixels != 0 {
        return Err(Error::Tiff(format!(
            "{} samples do not fill a {}x{} image",
            data.len(),
            cols,
            rows
        )));
    }

    Ok(DecodedPage {
        rows,
        cols,
        samples: data.len() / pixels,
        data,
    })
}

/// Read one band of a GeoTIFF file into a Raster
///
/// `band` is 1-indexed and counts samples of the first image; defaults to 1.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file, band)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data), band)
}

fn decode_geotiff<T, R>(reader: R, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = open_decoder(reader)?;
    let meta = GeoTiffMeta::read(&mut decoder);
    let page = decode_page(&mut decoder)?;

    let band = band.unwrap_or(1);
    if band == 0 || band > page.samples {
        return Err(Error::invalid(
            "band",
            band,
            format!("image has {} band(s), numbered from 1", page.samples),
        ));
    }

    let data: Vec<T> = page
        .data
        .iter()
        .skip(band - 1)
        .step_by(page.samples)
        .map(|&v| T::from_f64(v))
        .collect();

    let mut raster = Raster::from_vec(data, page.rows, page.cols)?;
    if let Some(transform) = meta.transform {
        raster.set_transform(transform);
    }
    raster.set_crs(meta.crs());
    raster.set_nodata(meta.nodata.map(T::from_f64));
    Ok(raster)
}

/// Write a Raster to a single-band 32-bit float GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_geotiff(raster, file, options.unwrap_or_default())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| v.to_f64().map_or(f32::NAN, |f| f as f32))
        .collect();

    let mut meta = GeoTiffMeta::from_georef(raster.transform(), raster.crs());
    meta.nodata = options.nodata.or_else(|| raster.nodata().and_then(|nd| nd.to_f64()));

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
    meta.write(image.encoder())?;
    image.write_data(&data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_buffer_roundtrip_keeps_georef() {
        let mut raster = Raster::from_vec(vec![0.0, 1.5, 2.5, 3.5, 4.5, 5.5], 2, 3).unwrap();
        raster.set_transform(GeoTransform::new(500_000.0, 4_100_000.0, 30.0, -30.0));
        raster.set_crs(Some(CRS::from_epsg(32611)));
        raster.set_nodata(Some(0.0));

        let buf = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf, None).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.get(1, 2).unwrap(), 5.5);
        assert_eq!(back.transform(), raster.transform());
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32611));
        assert_eq!(back.nodata(), Some(0.0));
    }

    #[test]
    fn test_meta_reads_written_tags() {
        let raster: Raster<f64> = Raster::new(2, 2).with_georef(
            GeoTransform::new(600_000.0, 4_500_000.0, 30.0, -30.0),
            Some(CRS::from_epsg(32613)),
        );
        let buf = write_geotiff_to_buffer(&raster, Some(GeoTiffOptions { nodata: Some(-1.0) })).unwrap();

        let mut decoder = open_decoder(Cursor::new(&buf)).unwrap();
        let meta = GeoTiffMeta::read(&mut decoder);
        assert_eq!(meta.transform, Some(*raster.transform()));
        assert_eq!(meta.crs().and_then(|c| c.epsg()), Some(32613));
        assert_eq!(meta.nodata, Some(-1.0));
        assert_eq!(meta.geokeys.as_deref().map(|k| k[3]), Some(3));
    }

    #[test]
    fn test_file_roundtrip_with_explicit_nodata() {
        let raster = Raster::from_vec(vec![1.0f32, -9999.0, 3.0, 4.0], 2, 2).unwrap();
        let tmp = NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path(), Some(GeoTiffOptions { nodata: Some(-9999.0) })).unwrap();

        let back: Raster<f32> = read_geotiff(tmp.path(), Some(1)).unwrap();
        assert_eq!(back.nodata(), Some(-9999.0));
        assert!(back.is_nodata(back.get(0, 1).unwrap()));
    }

    #[test]
    fn test_band_out_of_range() {
        let raster: Raster<f64> = Raster::new(2, 2);
        let buf = write_geotiff_to_buffer(&raster, None).unwrap();
        assert!(read_geotiff_from_buffer::<f64>(&buf, Some(2)).is_err());
        assert!(read_geotiff_from_buffer::<f64>(&buf, Some(0)).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_geotiff::<f64, _>("/nonexistent/scene.tif", None).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
