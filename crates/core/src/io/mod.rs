//! I/O for hyperspectral cubes, rasters and reference tables
//!
//! - GeoTIFF via the `tiff` crate: single-band rasters, multi-page cubes,
//!   8-bit classification export and display quicklooks
//! - CSV via the `csv` crate: band tables, solar spectra, spectral libraries

mod cube;
mod export;
mod native;
mod tables;

pub use cube::{read_cube, read_cube_from_buffer, write_cube};
pub use export::{
    read_classification, write_classification, write_quicklook, write_quicklook_rgb, CLASS_NODATA,
};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffMeta,
    GeoTiffOptions,
};
pub use tables::{
    parse_band_table, parse_solar_spectrum, parse_spectral_library, read_band_table,
    read_solar_spectrum, read_spectral_library, write_dark_objects, BandEntry,
};
