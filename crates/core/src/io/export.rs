//! 8-bit raster export: classification maps and display quicklooks

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::native::{decode_page, open_decoder, GeoTiffMeta};
use crate::raster::{GeoTransform, Raster};
use ndarray::{Array2, Array3};
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;
use tiff::encoder::colortype::{Gray8, RGB8};
use tiff::encoder::TiffEncoder;

/// No-data label of classification rasters
pub const CLASS_NODATA: u8 = 255;

/// Write a classification raster using a template GeoTIFF's georeferencing.
///
/// The template must have the same dimensions as `labels`. Its pixel scale,
/// tiepoint and GeoKey tags are copied; the output is single-band 8-bit
/// unsigned with no-data 255.
pub fn write_classification<P, Q>(labels: &Raster<u8>, template: P, output: Q) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mut decoder = open_decoder(BufReader::new(File::open(template.as_ref())?))?;
    let mut meta = GeoTiffMeta::read(&mut decoder);
    let (width, height) = decoder.dimensions()?;
    if (height as usize, width as usize) != labels.shape() {
        return Err(Error::SizeMismatch {
            er: height as usize,
            ec: width as usize,
            ar: labels.rows(),
            ac: labels.cols(),
        });
    }
    // A template without georeferencing falls back to the labels' own
    let own = GeoTiffMeta::from_georef(labels.transform(), labels.crs());
    if meta.transform.is_none() {
        meta.transform = own.transform;
    }
    if meta.geokeys.is_none() {
        meta.geokeys = own.geokeys;
    }
    meta.nodata = Some(CLASS_NODATA as f64);

    let file = BufWriter::new(File::create(output.as_ref())?);
    encode_gray8(labels.data(), &meta, file)
}

fn encode_gray8<W: Write + Seek>(data: &Array2<u8>, meta: &GeoTiffMeta, writer: W) -> Result<()> {
    let (rows, cols) = data.dim();
    let pixels: Vec<u8> = data.iter().copied().collect();
    let mut encoder = TiffEncoder::new(writer)?;
    let mut image = encoder.new_image::<Gray8>(cols as u32, rows as u32)?;
    meta.write(image.encoder())?;
    image.write_data(&pixels)?;
    Ok(())
}

fn to_byte(v: f64) -> u8 {
    if v.is_nan() {
        0
    } else {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Write a [0, 1] display image as an 8-bit greyscale GeoTIFF
pub fn write_quicklook<P: AsRef<Path>>(
    image: &Array2<f64>,
    transform: &GeoTransform,
    crs: Option<&CRS>,
    path: P,
) -> Result<()> {
    let meta = GeoTiffMeta::from_georef(transform, crs);
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_gray8(&image.mapv(to_byte), &meta, file)
}

/// Write a rows × cols × 3 [0, 1] composite as an 8-bit RGB GeoTIFF
pub fn write_quicklook_rgb<P: AsRef<Path>>(
    image: &Array3<f64>,
    transform: &GeoTransform,
    crs: Option<&CRS>,
    path: P,
) -> Result<()> {
    let (rows, cols, channels) = image.dim();
    if channels != 3 {
        return Err(Error::invalid("image", channels, "an RGB composite needs 3 channels"));
    }
    let pixels: Vec<u8> = image
        .as_standard_layout()
        .iter()
        .map(|&v| to_byte(v))
        .collect();
    let meta = GeoTiffMeta::from_georef(transform, crs);

    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file)?;
    let mut tiff_image = encoder.new_image::<RGB8>(cols as u32, rows as u32)?;
    meta.write(tiff_image.encoder())?;
    tiff_image.write_data(&pixels)?;
    Ok(())
}

/// Read back an 8-bit classification raster (labels, georeferencing and no-data)
pub fn read_classification<P: AsRef<Path>>(path: P) -> Result<Raster<u8>> {
    let mut decoder = open_decoder(BufReader::new(File::open(path.as_ref())?))?;
    let meta = GeoTiffMeta::read(&mut decoder);
    let page = decode_page(&mut decoder)?;
    if page.samples != 1 {
        return Err(Error::UnsupportedDataType(format!(
            "classification must be single-band, found {} samples",
            page.samples
        )));
    }
    let labels = Array2::from_shape_vec(
        (page.rows, page.cols),
        page.data.iter().map(|&v| v as u8).collect(),
    )?;
    let mut raster = Raster::from_array(labels)
        .with_georef(meta.transform.unwrap_or_default(), meta.crs());
    raster.set_nodata(meta.nodata.map(|nd| nd as u8));
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::write_geotiff;
    use ndarray::array;
    use tempfile::tempdir;

    fn template(dir: &Path) -> std::path::PathBuf {
        let mut raster: Raster<f64> = Raster::new(2, 3);
        raster.set_transform(GeoTransform::new(600_000.0, 4_500_000.0, 30.0, -30.0));
        raster.set_crs(Some(CRS::from_epsg(32613)));
        let path = dir.join("template.tif");
        write_geotiff(&raster, &path, None).unwrap();
        path
    }

    #[test]
    fn test_classification_takes_template_georef() {
        let dir = tempdir().unwrap();
        let template = template(dir.path());
        let labels = Raster::from_vec(vec![0u8, 1, 255, 1, 0, 2], 2, 3).unwrap();
        let out = dir.path().join("classes.tif");

        write_classification(&labels, &template, &out).unwrap();

        let back = read_classification(&out).unwrap();
        assert_eq!(back.data(), labels.data());
        assert_eq!(back.nodata(), Some(CLASS_NODATA));
        assert_eq!(back.transform(), &GeoTransform::new(600_000.0, 4_500_000.0, 30.0, -30.0));
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32613));
    }

    #[test]
    fn test_plain_template_keeps_label_georef() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("plain.tif");
        {
            let file = BufWriter::new(File::create(&template).unwrap());
            let mut encoder = TiffEncoder::new(file).unwrap();
            encoder.write_image::<Gray8>(3, 2, &[0u8; 6]).unwrap();
        }
        let gt = GeoTransform::new(350_000.0, 4_200_000.0, 30.0, -30.0);
        let labels = Raster::from_vec(vec![0u8, 1, 1, 0, 255, 1], 2, 3)
            .unwrap()
            .with_georef(gt, Some(CRS::from_epsg(32613)));
        let out = dir.path().join("classes.tif");

        write_classification(&labels, &template, &out).unwrap();

        let back = read_classification(&out).unwrap();
        assert_eq!(back.transform(), &gt);
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32613));
    }

    #[test]
    fn test_classification_size_mismatch() {
        let dir = tempdir().unwrap();
        let template = template(dir.path());
        let labels: Raster<u8> = Raster::new(3, 3);
        let err = write_classification(&labels, &template, dir.path().join("x.tif")).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }

    #[test]
    fn test_classification_missing_template() {
        let dir = tempdir().unwrap();
        let labels: Raster<u8> = Raster::new(1, 1);
        let err = write_classification(&labels, dir.path().join("none.tif"), dir.path().join("x.tif"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_quicklooks() {
        let dir = tempdir().unwrap();
        let gt = GeoTransform::default();
        let grey = array![[0.0, 0.5], [1.0, 2.0]];
        write_quicklook(&grey, &gt, None, dir.path().join("grey.tif")).unwrap();
        let back = read_classification(dir.path().join("grey.tif")).unwrap();
        assert_eq!(back.data(), &array![[0u8, 128], [255, 255]]);

        let rgb = Array3::from_elem((2, 2, 3), 0.25);
        write_quicklook_rgb(&rgb, &gt, None, dir.path().join("rgb.tif")).unwrap();
        assert!(write_quicklook_rgb(&Array3::zeros((2, 2, 2)), &gt, None, dir.path().join("bad.tif")).is_err());
    }
}
