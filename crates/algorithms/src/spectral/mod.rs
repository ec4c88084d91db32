//! Spectral angle mapping and classification
//!
//! - **sam**: spectral angles and arg-min matching
//! - **classify**: classification of a reflectance cube against a library

mod classify;
mod sam;

pub use classify::{
    classification_mask, sam_angles, sam_classify, SamInput, SamParams, SpectralAngleMapper,
};
pub(crate) use classify::classify_with_angles;
pub use sam::{best_match, spectral_angle, spectral_angles, AngleMap, NODATA_CLASS, ZERO_VECTOR_ANGLE};
