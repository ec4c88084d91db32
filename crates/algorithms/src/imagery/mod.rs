//! Display transforms for radiance and reflectance bands
//!
//! - Percentile stretch: single band to [0, 1]
//! - RGB composite: three independently stretched bands

mod stretch;

pub use stretch::{
    percentile_stretch, rgb_composite, stretch_raster, PercentileStretch, StretchParams,
};
