use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    config::ModelConfig,
    error::TrainingError,
    learn::{ForestConfig, RandomForest, Regressor, StandardScaler},
    synthetic::{self, TrainingDataset},
};

/// Goodness-of-fit figures from one training pass. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_score: f64,
    pub test_score: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub elapsed: Duration,
}

/// A scaler and forest fitted together. Only ever replaced as a whole.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub(crate) generation: u64,
    scaler: StandardScaler,
    forest: RandomForest,
    report: TrainingReport,
    trained_at: DateTime<Utc>,
}

impl FittedModel {
    pub fn new(scaler: StandardScaler, forest: RandomForest, report: TrainingReport) -> Self {
        Self { generation: 0, scaler, forest, report, trained_at: Utc::now() }
    }

    /// Position in the install sequence; 0 until installed into a `ModelState`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

/// Deterministic shuffled split into `(train, test)` partitions.
pub fn train_test_split(
    dataset: &TrainingDataset,
    test_fraction: f64,
    seed: u64,
) -> Result<(TrainingDataset, TrainingDataset), TrainingError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidConfig(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n = dataset.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(TrainingError::InvalidConfig(format!(
            "cannot split {n} rows with test_fraction {test_fraction}"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test, train) = indices.split_at(n_test);
    Ok((dataset.select(train)?, dataset.select(test)?))
}

#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: ModelConfig,
}

impl Trainer {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Generate the synthetic dataset and fit on it.
    pub fn train(&self) -> Result<FittedModel, TrainingError> {
        self.config.validate()?;
        let dataset = synthetic::generate(&self.config)?;
        self.fit(&dataset)
    }

    /// Split, scale on the training partition only, fit the forest and score both partitions.
    pub fn fit(&self, dataset: &TrainingDataset) -> Result<FittedModel, TrainingError> {
        let started = Instant::now();
        let (train, test) =
            train_test_split(dataset, self.config.test_fraction, self.config.seed)?;

        let scaler = StandardScaler::fit(train.features())?;
        let train_x = scaler.transform_many(train.features());
        let test_x = scaler.transform_many(test.features());

        let forest_config = ForestConfig::from(&self.config);
        let forest = RandomForest::fit(&train_x, train.targets(), &forest_config)?;

        let report = TrainingReport {
            train_score: forest.score(&train_x, train.targets())?,
            test_score: forest.score(&test_x, test.targets())?,
            train_rows: train.len(),
            test_rows: test.len(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            train_score = report.train_score,
            test_score = report.test_score,
            trees = forest.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Model trained"
        );

        Ok(FittedModel::new(scaler, forest, report))
    }
}
