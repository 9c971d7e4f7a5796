//! Bagged ensemble of regression trees.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{Regressor, RegressionTree, TreeConfig};
use crate::{config::ModelConfig, error::TrainingError, features::FeatureVector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub seed: u64,
    pub tree: TreeConfig,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self { n_estimators: 100, seed: 42, tree: TreeConfig::default() }
    }
}

impl From<&ModelConfig> for ForestConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            seed: config.seed,
            tree: TreeConfig {
                max_depth: config.max_depth,
                min_samples_split: config.min_samples_split,
                min_samples_leaf: config.min_samples_leaf,
            },
        }
    }
}

/// Mean of trees, each fit on a bootstrap resample of the training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(
        rows: &[FeatureVector],
        targets: &[f64],
        config: &ForestConfig,
    ) -> Result<Self, TrainingError> {
        if rows.len() != targets.len() {
            return Err(TrainingError::ShapeMismatch { expected: rows.len(), got: targets.len() });
        }
        if rows.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if config.n_estimators == 0 {
            return Err(TrainingError::InvalidConfig("n_estimators must be positive".into()));
        }

        let n = rows.len();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let trees = (0..config.n_estimators)
            .map(|_| {
                let mut tree_rng = ChaCha8Rng::seed_from_u64(rng.next_u64());
                let sample: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
                RegressionTree::fit_indices(rows, targets, &sample, &config.tree)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { trees })
    }

    /// Assemble a forest from already fitted trees.
    pub fn from_trees(trees: Vec<RegressionTree>) -> Result<Self, TrainingError> {
        if trees.is_empty() {
            return Err(TrainingError::InvalidConfig("a forest needs at least one tree".into()));
        }
        Ok(Self { trees })
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

impl Regressor for RandomForest {
    fn predict(&self, features: &FeatureVector) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict(features)).sum();
        total / self.trees.len() as f64
    }
}
