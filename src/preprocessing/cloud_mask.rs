use super::PreprocessError;
use ndarray::Array2;
use std::fmt;

/// QA60 bits flagging a cloudy pixel: 10 (opaque clouds) and 11 (cirrus).
pub const CLOUD_BITS: u64 = (1 << 10) | (1 << 11);

/// Clear where neither cloud bit is set.
pub fn bitmask_cloud_mask<T>(qa: &Array2<T>) -> Array2<bool>
where
    T: Copy + Into<u64>,
{
    qa.mapv(|value| (Into::<u64>::into(value) & CLOUD_BITS) == 0)
}

/// Clear where the blue band, scaled by its own maximum, is at most
/// `threshold`.
pub fn reflectance_cloud_mask(
    blue: &Array2<f64>,
    threshold: f64,
) -> Result<Array2<bool>, PreprocessError> {
    let max = blue.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 || !max.is_finite() {
        return Err(PreprocessError::DegenerateMaximum(max));
    }

    Ok(blue.mapv(|value| value / max <= threshold))
}

pub fn all_clear_mask(shape: (usize, usize)) -> Array2<bool> {
    Array2::from_elem(shape, true)
}

/// How a tile's cloud mask was derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloudMaskMethod {
    Bitmask,
    Reflectance { threshold: f64 },
    Disabled,
}

impl CloudMaskMethod {
    /// Picks the method for one tile: the quality band wins when present.
    pub fn select(has_quality_band: bool, enabled: bool, reflectance_threshold: f64) -> Self {
        match (enabled, has_quality_band) {
            (false, _) => CloudMaskMethod::Disabled,
            (true, true) => CloudMaskMethod::Bitmask,
            (true, false) => CloudMaskMethod::Reflectance {
                threshold: reflectance_threshold,
            },
        }
    }
}

impl fmt::Display for CloudMaskMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudMaskMethod::Bitmask => write!(f, "QA60 bitmask"),
            CloudMaskMethod::Reflectance { threshold } => {
                write!(f, "blue reflectance <= {}", threshold)
            }
            CloudMaskMethod::Disabled => write!(f, "disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_bitmask_cloud_mask() {
        let qa: Array2<u16> = array![[0, 1024], [2048, 3072]];
        let mask = bitmask_cloud_mask(&qa);
        assert_eq!(mask, array![[true, false], [false, false]]);
    }

    #[test]
    fn test_bitmask_ignores_other_bits() {
        let qa: Array2<u32> = array![[1, 512, 4096, 1 << 20, 1024 | 1]];
        let mask = bitmask_cloud_mask(&qa);
        assert_eq!(mask, array![[true, true, true, true, false]]);
    }

    #[test]
    fn test_reflectance_cloud_mask() {
        let blue = array![[0.1, 0.3], [0.2, 0.05]];
        // Scaled by 0.3: [[0.333, 1.0], [0.667, 0.167]]
        let mask = reflectance_cloud_mask(&blue, 0.2).unwrap();
        assert_eq!(mask, array![[false, false], [false, true]]);
    }

    #[test]
    fn test_reflectance_threshold_is_inclusive() {
        let blue = array![[250.0, 1000.0, 251.0]];
        let mask = reflectance_cloud_mask(&blue, 0.25).unwrap();
        assert_eq!(mask, array![[true, false, false]]);
    }

    #[test]
    fn test_reflectance_zero_maximum_is_degenerate() {
        let blue = Array2::<f64>::zeros((2, 2));
        assert_eq!(
            reflectance_cloud_mask(&blue, 0.2),
            Err(PreprocessError::DegenerateMaximum(0.0))
        );
    }

    #[test]
    fn test_method_selection() {
        assert_eq!(CloudMaskMethod::select(true, true, 0.2), CloudMaskMethod::Bitmask);
        assert_eq!(
            CloudMaskMethod::select(false, true, 0.2),
            CloudMaskMethod::Reflectance { threshold: 0.2 }
        );
        assert_eq!(CloudMaskMethod::select(true, false, 0.2), CloudMaskMethod::Disabled);
    }

    #[test]
    fn test_all_clear_mask() {
        let mask = all_clear_mask((2, 3));
        assert_eq!(mask.dim(), (2, 3));
        assert!(mask.iter().all(|&clear| clear));
    }
}
