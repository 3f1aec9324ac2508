use super::PreprocessError;
use ndarray::{Array2, Zip};

fn check_shapes(left: (usize, usize), right: (usize, usize)) -> Result<(), PreprocessError> {
    if left != right {
        return Err(PreprocessError::ShapeMismatch { left, right });
    }
    Ok(())
}

/// Normalized difference vegetation index
///
/// `(nir - red) / (nir + red + epsilon)`
///
/// `epsilon` keeps pixels where both bands are zero finite (they map to 0).
pub fn calculate_index(
    nir: &Array2<f64>,
    red: &Array2<f64>,
    epsilon: f64,
) -> Result<Array2<f64>, PreprocessError> {
    check_shapes(nir.dim(), red.dim())?;

    Ok(Zip::from(nir)
        .and(red)
        .map_collect(|&nir, &red| (nir - red) / (nir + red + epsilon)))
}

/// Keeps `values` where `clear` is set and replaces the rest with NaN.
pub fn mask_invalid(
    values: &Array2<f64>,
    clear: &Array2<bool>,
) -> Result<Array2<f64>, PreprocessError> {
    check_shapes(values.dim(), clear.dim())?;

    Ok(Zip::from(values)
        .and(clear)
        .map_collect(|&value, &clear| if clear { value } else { f64::NAN }))
}

/// `value > threshold` per pixel. NaN never passes.
pub fn threshold_mask(values: &Array2<f64>, threshold: f64) -> Array2<bool> {
    values.mapv(|value| value > threshold)
}
