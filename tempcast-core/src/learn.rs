//! Learning primitives: standardization, regression trees, bagged forests and scoring.

use std::fmt::Debug;

use crate::{error::TrainingError, features::FeatureVector};

pub mod forest;
pub mod metrics;
pub mod scaler;
pub mod tree;

pub use forest::{ForestConfig, RandomForest};
pub use metrics::r2_score;
pub use scaler::StandardScaler;
pub use tree::{RegressionTree, TreeConfig, TreeNode};

/// A fitted model mapping one feature row to one number.
pub trait Regressor: Send + Sync + Debug {
    fn predict(&self, features: &FeatureVector) -> f64;

    fn predict_many(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Coefficient of determination on `rows` against `targets`.
    fn score(&self, rows: &[FeatureVector], targets: &[f64]) -> Result<f64, TrainingError> {
        r2_score(targets, &self.predict_many(rows))
    }
}
