use serde::{Deserialize, Serialize};

use crate::{
    error::TrainingError,
    features::{FEATURE_COUNT, FeatureVector},
};

/// Per-column standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    /// Fit column means and population standard deviations.
    ///
    /// Zero-variance columns get a scale of 1 so they map to 0 rather than NaN.
    pub fn fit(rows: &[FeatureVector]) -> Result<Self, TrainingError> {
        if rows.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }

        let n = rows.len() as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [0.0; FEATURE_COUNT];

        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.values()) {
                *m += v / n;
            }
        }
        for row in rows {
            for ((s, m), v) in scale.iter_mut().zip(&mean).zip(row.values()) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in scale.iter_mut() {
            *s = s.sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        if !(mean.iter().all(|m| m.is_finite()) && scale.iter().all(|s| s.is_finite())) {
            return Err(TrainingError::NonFinite);
        }

        Ok(Self { mean, scale })
    }

    pub fn from_parts(mean: [f64; FEATURE_COUNT], scale: [f64; FEATURE_COUNT]) -> Self {
        Self { mean, scale }
    }

    pub fn mean(&self) -> &[f64; FEATURE_COUNT] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; FEATURE_COUNT] {
        &self.scale
    }

    pub fn transform(&self, row: &FeatureVector) -> FeatureVector {
        let v = row.values();
        FeatureVector::new(std::array::from_fn(|i| (v[i] - self.mean[i]) / self.scale[i]))
    }

    pub fn transform_many(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
