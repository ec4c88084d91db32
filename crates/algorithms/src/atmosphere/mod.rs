//! Atmospheric correction
//!
//! - **dark_object**: per-band dark-object radiance
//! - **cost**: COST radiance-to-reflectance conversion

mod cost;
mod dark_object;

pub use cost::{
    cost_reflectance, cost_reflectance_band, CostCorrection, CostInput, SceneGeometry,
    NEGATIVE_REFLECTANCE_FLOOR,
};
pub use dark_object::{dark_object_values, DarkObjectParams, DarkObjectSubtraction, EmptyBandPolicy};
