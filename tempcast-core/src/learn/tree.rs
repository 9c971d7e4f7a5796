//! CART regression tree with the squared-error criterion.

use serde::{Deserialize, Serialize};

use super::Regressor;
use crate::{
    error::TrainingError,
    features::{FEATURE_COUNT, FeatureVector},
};

/// Minimum reduction in squared error for a split to be kept.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { max_depth: None, min_samples_split: 2, min_samples_leaf: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Internal {
        feature: usize,
        /// Rows with `features[feature] <= threshold` go left.
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        value: f64,
        samples: usize,
    },
}

impl TreeNode {
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Internal { feature, threshold, left, right } => {
                    node = if features.get(*feature) <= *threshold { left } else { right };
                }
                TreeNode::Leaf { value, .. } => return *value,
            }
        }
    }

    pub fn count_leaves(&self) -> usize {
        match self {
            TreeNode::Internal { left, right, .. } => left.count_leaves() + right.count_leaves(),
            TreeNode::Leaf { .. } => 1,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
            TreeNode::Leaf { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
}

struct Split {
    feature: usize,
    threshold: f64,
    cost: f64,
}

impl RegressionTree {
    /// Fit on every row of `rows`.
    pub fn fit(
        rows: &[FeatureVector],
        targets: &[f64],
        config: &TreeConfig,
    ) -> Result<Self, TrainingError> {
        let indices: Vec<usize> = (0..rows.len()).collect();
        Self::fit_indices(rows, targets, &indices, config)
    }

    /// Fit on the rows named by `indices`. Repeated indices count as repeated samples.
    pub fn fit_indices(
        rows: &[FeatureVector],
        targets: &[f64],
        indices: &[usize],
        config: &TreeConfig,
    ) -> Result<Self, TrainingError> {
        if rows.len() != targets.len() {
            return Err(TrainingError::ShapeMismatch { expected: rows.len(), got: targets.len() });
        }
        if indices.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= rows.len()) {
            return Err(TrainingError::ShapeMismatch { expected: rows.len(), got: bad + 1 });
        }

        let builder = Builder { rows, targets, config };
        let root = builder.build(indices.to_vec(), 0);
        Ok(Self { root })
    }

    /// A tree that always predicts `value`.
    pub fn constant(value: f64) -> Self {
        Self { root: TreeNode::Leaf { value, samples: 0 } }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }
}

impl Regressor for RegressionTree {
    fn predict(&self, features: &FeatureVector) -> f64 {
        self.root.predict(features)
    }
}

struct Builder<'a> {
    rows: &'a [FeatureVector],
    targets: &'a [f64],
    config: &'a TreeConfig,
}

impl Builder<'_> {
    fn build(&self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n = indices.len();
        let sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let sum_sq: f64 = indices.iter().map(|&i| self.targets[i].powi(2)).sum();
        let sse = sum_sq - sum * sum / n as f64;
        let leaf = TreeNode::Leaf { value: sum / n as f64, samples: n };

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || n < self.config.min_samples_split || self.is_pure(&indices) {
            return leaf;
        }

        let Some(split) = self.best_split(&indices, sum, sum_sq) else {
            return leaf;
        };
        if sse - split.cost <= MIN_GAIN {
            return leaf;
        }

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.rows[i].get(split.feature) <= split.threshold);

        TreeNode::Internal {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        let first = self.targets[indices[0]];
        indices.iter().all(|&i| (self.targets[i] - first).abs() < 1e-10)
    }

    /// Lowest summed child SSE over all features, scanning each feature in sorted order.
    fn best_split(&self, indices: &[usize], total: f64, total_sq: f64) -> Option<Split> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf;
        let mut best: Option<Split> = None;
        let mut order = indices.to_vec();

        for feature in 0..FEATURE_COUNT {
            order.sort_by(|&a, &b| {
                self.rows[a].get(feature).total_cmp(&self.rows[b].get(feature))
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let y = self.targets[order[pos]];
                left_sum += y;
                left_sq += y * y;

                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let here = self.rows[order[pos]].get(feature);
                let next = self.rows[order[pos + 1]].get(feature);
                if here == next {
                    continue;
                }

                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let cost = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);

                if best.as_ref().is_none_or(|b| cost < b.cost) {
                    let mut threshold = here + (next - here) / 2.0;
                    // Midpoint can round up to `next` for adjacent floats.
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(Split { feature, threshold, cost });
                }
            }
        }

        best
    }
}
