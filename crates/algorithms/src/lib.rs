//! # hypersam Algorithms
//!
//! Hyperspectral processing algorithms for hypersam.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: Percentile stretch, RGB composites
//! - **atmosphere**: Dark-object estimation, COST reflectance correction
//! - **spectral**: Spectral angle mapping and classification
//! - **statistics**: Percentiles of positive values
//! - **pipeline**: Radiance to classification in one call

pub mod atmosphere;
pub mod imagery;
pub(crate) mod maybe_rayon;
pub mod pipeline;
pub mod spectral;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::atmosphere::{
        cost_reflectance, cost_reflectance_band, dark_object_values,
        CostCorrection, CostInput, DarkObjectParams, DarkObjectSubtraction, EmptyBandPolicy,
        SceneGeometry, NEGATIVE_REFLECTANCE_FLOOR,
    };
    pub use crate::imagery::{
        percentile_stretch, rgb_composite, stretch_raster, PercentileStretch, StretchParams,
    };
    pub use crate::pipeline::{run_pipeline, PipelineOutput, PipelineParams};
    pub use crate::spectral::{
        best_match, sam_angles, sam_classify, spectral_angle, spectral_angles,
        AngleMap, SamInput, SamParams, SpectralAngleMapper, NODATA_CLASS, ZERO_VECTOR_ANGLE,
    };
    pub use hypersam_core::prelude::*;
}
