//! Random forest classifier backed by smartcore.

use super::{ModelError, Sample, VegetationClassifier};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;

type Forest = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees.
    pub n_trees: u16,
    /// Maximum tree depth, unlimited when `None`.
    pub max_depth: Option<u16>,
    /// Nodes with fewer samples become leaves.
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl ForestConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_n_trees(mut self, n_trees: u16) -> Self {
        self.n_trees = n_trees;
        self
    }

    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: u16) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn parameters(&self) -> RandomForestClassifierParameters {
        let parameters = RandomForestClassifierParameters::default()
            .with_n_trees(self.n_trees)
            .with_min_samples_split(self.min_samples_split)
            .with_seed(self.seed);
        match self.max_depth {
            Some(depth) => parameters.with_max_depth(depth),
            None => parameters,
        }
    }
}

fn is_finite(sample: &Sample) -> bool {
    sample.iter().all(|v| v.is_finite())
}

fn to_matrix(rows: &[&Sample]) -> Result<DenseMatrix<f64>, ModelError> {
    let rows: Vec<Vec<f64>> = rows.iter().map(|sample| sample.to_vec()).collect();
    Ok(DenseMatrix::from_2d_vec(&rows)?)
}

/// A trained forest together with the settings it was trained with.
#[derive(Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    forest: Forest,
}

impl fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RandomForest {
    /// Trains on every row whose features are all finite.
    pub fn fit(
        samples: &[Sample],
        labels: &[u8],
        config: &ForestConfig,
    ) -> Result<RandomForest, ModelError> {
        if samples.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                samples: samples.len(),
                labels: labels.len(),
            });
        }
        if config.n_trees == 0 {
            return Err(ModelError::NoEstimators);
        }

        let (rows, targets): (Vec<&Sample>, Vec<u32>) = samples
            .iter()
            .zip(labels)
            .filter(|(sample, _)| is_finite(sample))
            .map(|(sample, &label)| (sample, u32::from(label)))
            .unzip();
        if rows.is_empty() {
            return Err(ModelError::EmptyTraining);
        }
        log::debug!(
            "Training {} trees on {} of {} rows",
            config.n_trees,
            rows.len(),
            samples.len()
        );

        let forest = Forest::fit(&to_matrix(&rows)?, &targets, config.parameters())?;

        Ok(RandomForest {
            config: config.clone(),
            forest,
        })
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

impl VegetationClassifier for RandomForest {
    /// Rows with a non-finite feature are labeled 0 without being classified.
    fn predict(&self, samples: &[Sample]) -> Result<Vec<u8>, ModelError> {
        let mut labels = vec![0u8; samples.len()];
        let (positions, rows): (Vec<usize>, Vec<&Sample>) = samples
            .iter()
            .enumerate()
            .filter(|(_, sample)| is_finite(sample))
            .unzip();
        if rows.is_empty() {
            return Ok(labels);
        }

        let predicted = self.forest.predict(&to_matrix(&rows)?)?;
        for (position, label) in positions.into_iter().zip(predicted) {
            labels[position] = u8::from(label == 1);
        }

        Ok(labels)
    }
}
