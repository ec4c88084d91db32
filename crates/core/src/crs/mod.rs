//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// `GeographicTypeGeoKey`
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
/// `ProjectedCSTypeGeoKey`
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
/// Codes at or above this value are "user-defined" in GeoTIFF
const USER_DEFINED: u16 = 32767;

/// Coordinate Reference System, identified by its EPSG code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// Extract the EPSG code from a GeoTIFF `GeoKeyDirectoryTag`.
    ///
    /// The directory is a header `[version, rev, minor, count]` followed by
    /// `count` entries of `[key, location, count, value]`. Only keys stored
    /// inline (location 0) are considered; projected codes win over geographic.
    pub fn from_geokeys(directory: &[u16]) -> Option<Self> {
        let header = directory.get(..4)?;
        let n_keys = header[3] as usize;

        let mut geographic = None;
        let mut projected = None;
        for entry in directory[4..].chunks_exact(4).take(n_keys) {
            let (key, location, value) = (entry[0], entry[1], entry[3]);
            if location != 0 || value == 0 || value >= USER_DEFINED {
                continue;
            }
            match key {
                PROJECTED_CS_TYPE_KEY => projected = Some(value),
                GEOGRAPHIC_TYPE_KEY => geographic = Some(value),
                _ => {}
            }
        }
        projected
            .or(geographic)
            .map(|code| Self::from_epsg(code as u32))
    }

    /// Get EPSG code
    pub fn epsg(&self) -> Option<u32> {
        Some(self.epsg)
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32611);
        assert_eq!(crs.epsg(), Some(32611));
        assert_eq!(crs.identifier(), "EPSG:32611");
        assert_eq!(crs.to_string(), "EPSG:32611");
    }

    #[test]
    fn test_from_geokeys_projected() {
        let keys = [
            1, 1, 0, 3, //
            1024, 0, 1, 1, // model type projected
            1025, 0, 1, 1, // raster type area
            3072, 0, 1, 32611, // UTM 11N
        ];
        assert_eq!(CRS::from_geokeys(&keys).and_then(|c| c.epsg()), Some(32611));
    }

    #[test]
    fn test_from_geokeys_without_code() {
        let keys = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
        assert!(CRS::from_geokeys(&keys).is_none());
        assert!(CRS::from_geokeys(&[1, 1]).is_none());
    }
}
