//! Pixel classifier trained on the threshold mask.
//!
//! Each pixel is described by its vegetation index and blue reflectance. The
//! classifier is optional and sits next to the threshold pipeline; it never
//! replaces it.

use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub mod random_forest;

pub use random_forest::{ForestConfig, RandomForest};

pub const N_FEATURES: usize = 2;

/// `[index, blue]` for one pixel.
pub type Sample = [f64; N_FEATURES];

pub trait VegetationClassifier {
    /// One 0/1 label per sample.
    fn predict(&self, samples: &[Sample]) -> Result<Vec<u8>, ModelError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("grid shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("{samples} samples but {labels} labels")]
    LengthMismatch { samples: usize, labels: usize },

    #[error("no pixel with finite features to train on")]
    EmptyTraining,

    #[error("a forest needs at least one tree")]
    NoEstimators,

    #[error("classifier error: {0}")]
    Fit(#[from] smartcore::error::Failed),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn check_shape(left: (usize, usize), right: (usize, usize)) -> Result<(), ModelError> {
    if left != right {
        return Err(ModelError::ShapeMismatch { left, right });
    }
    Ok(())
}

/// Row-major samples from the index and blue grids.
pub fn pixel_features(index: &Array2<f64>, blue: &Array2<f64>) -> Result<Vec<Sample>, ModelError> {
    check_shape(index.dim(), blue.dim())?;
    Ok(index
        .iter()
        .zip(blue.iter())
        .map(|(&index, &blue)| [index, blue])
        .collect())
}

pub fn train_vegetation_classifier(
    index: &Array2<f64>,
    blue: &Array2<f64>,
    vegetation: &Array2<bool>,
    config: &ForestConfig,
) -> Result<RandomForest, ModelError> {
    check_shape(index.dim(), vegetation.dim())?;
    let samples = pixel_features(index, blue)?;
    let labels: Vec<u8> = vegetation.iter().map(|&v| u8::from(v)).collect();

    RandomForest::fit(&samples, &labels, config)
}

/// Labels every pixel and reshapes the result to the input grid.
pub fn predict_vegetation<C: VegetationClassifier>(
    model: &C,
    index: &Array2<f64>,
    blue: &Array2<f64>,
) -> Result<Array2<u8>, ModelError> {
    let samples = pixel_features(index, blue)?;
    let labels = model.predict(&samples)?;
    let predicted = labels.len();

    Array2::from_shape_vec(index.dim(), labels).map_err(|_| ModelError::LengthMismatch {
        samples: samples.len(),
        labels: predicted,
    })
}

pub fn save_model(model: &RandomForest, path: &Path) -> Result<(), ModelError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, model)?;
    Ok(())
}

pub fn load_model(path: &Path) -> Result<RandomForest, ModelError> {
    let reader = BufReader::new(File::open(path)?);
    let model = serde_json::from_reader(reader)?;
    Ok(model)
}
