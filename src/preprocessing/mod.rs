//! Per-pixel transforms between the loaded bands and the vegetation mask.
//!
//! Everything here is pure: grids in, grids out.

pub mod cloud_mask;
pub mod indices;

pub use cloud_mask::{
    CLOUD_BITS, CloudMaskMethod, all_clear_mask, bitmask_cloud_mask, reflectance_cloud_mask,
};
pub use indices::{calculate_index, mask_invalid, threshold_mask};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PreprocessError {
    #[error("grid shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("cannot normalize the blue band by its maximum value {0}")]
    DegenerateMaximum(f64),
}
