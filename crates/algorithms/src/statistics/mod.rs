//! Statistics over band values
//!
//! - **percentile**: Linearly interpolated percentiles of positive values

pub mod percentile;

pub use percentile::{
    percentile_of_sorted, positive_percentiles, sorted_positive, validate_percentile,
};
