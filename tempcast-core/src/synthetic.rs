//! Synthetic training data.
//!
//! No historical observations are available, so the model is bootstrapped from
//! a parametric weather model whose target is the current temperature shifted
//! by a seasonal and a diurnal sine term plus noise.

use std::f64::consts::PI;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Exp, Normal};

use crate::{
    config::ModelConfig,
    error::TrainingError,
    features::{FEATURE_COUNT, FeatureVector},
};

const SEASONAL_AMPLITUDE: f64 = 5.0;
const DIURNAL_AMPLITUDE: f64 = 3.0;
const MEAN_WIND_SPEED: f64 = 3.0;

/// Feature rows and their targets, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingDataset {
    features: Vec<FeatureVector>,
    targets: Vec<f64>,
}

impl TrainingDataset {
    pub fn new(features: Vec<FeatureVector>, targets: Vec<f64>) -> Result<Self, TrainingError> {
        if features.len() != targets.len() {
            return Err(TrainingError::ShapeMismatch {
                expected: features.len(),
                got: targets.len(),
            });
        }
        if features.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        Ok(Self { features, targets })
    }

    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Result<Self, TrainingError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(TrainingError::ShapeMismatch { expected: self.len(), got: bad + 1 });
        }
        let features = indices.iter().map(|&i| self.features[i]).collect();
        let targets = indices.iter().map(|&i| self.targets[i]).collect();
        Self::new(features, targets)
    }
}

/// Sample `config.n_samples` rows with an RNG seeded from `config.seed`.
pub fn generate(config: &ModelConfig) -> Result<TrainingDataset, TrainingError> {
    let n = config.n_samples;
    if n == 0 {
        return Err(TrainingError::InvalidConfig("n_samples must be positive".into()));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let temperature = normal(20.0, 10.0)?;
    let pressure = normal(1013.0, 20.0)?;
    let noise = normal(0.0, 2.0)?;
    let visibility = normal(10_000.0, 2_000.0)?;
    let wind_speed = Exp::new(1.0 / MEAN_WIND_SPEED)
        .map_err(|e| TrainingError::Distribution(e.to_string()))?;

    let hours = uniform_column(&mut rng, n, 0, 24);
    let days = uniform_column(&mut rng, n, 1, 32);
    let months = uniform_column(&mut rng, n, 1, 13);
    let weekdays = uniform_column(&mut rng, n, 0, 7);
    let temps: Vec<f64> = (0..n).map(|_| temperature.sample(&mut rng)).collect();
    let humidity = uniform_column(&mut rng, n, 30, 100);
    let pressures: Vec<f64> = (0..n).map(|_| pressure.sample(&mut rng)).collect();
    let feels_like: Vec<f64> = temps.iter().map(|t| t + noise.sample(&mut rng)).collect();
    let wind_speeds: Vec<f64> = (0..n).map(|_| wind_speed.sample(&mut rng)).collect();
    let wind_degs = uniform_column(&mut rng, n, 0, 360);
    let clouds = uniform_column(&mut rng, n, 0, 101);
    let visibilities: Vec<f64> = (0..n).map(|_| visibility.sample(&mut rng)).collect();

    let columns: [&[f64]; FEATURE_COUNT] = [
        &hours,
        &days,
        &months,
        &weekdays,
        &temps,
        &humidity,
        &pressures,
        &feels_like,
        &wind_speeds,
        &wind_degs,
        &clouds,
        &visibilities,
    ];

    let features: Vec<FeatureVector> = (0..n)
        .map(|row| FeatureVector::new(std::array::from_fn(|col| columns[col][row])))
        .collect();

    let targets: Vec<f64> = (0..n)
        .map(|row| {
            future_temperature(temps[row], months[row], hours[row]) + noise.sample(&mut rng)
        })
        .collect();

    TrainingDataset::new(features, targets)
}

/// Noise-free part of the target.
pub fn future_temperature(temp: f64, month: f64, hour: f64) -> f64 {
    let seasonal = SEASONAL_AMPLITUDE * (2.0 * PI * month / 12.0).sin();
    let diurnal = DIURNAL_AMPLITUDE * (2.0 * PI * hour / 24.0).sin();
    temp + seasonal + diurnal
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>, TrainingError> {
    Normal::new(mean, std_dev).map_err(|e| TrainingError::Distribution(e.to_string()))
}

/// Integers drawn uniformly from `low..high`, stored as floats.
fn uniform_column(rng: &mut ChaCha8Rng, n: usize, low: i32, high: i32) -> Vec<f64> {
    (0..n).map(|_| f64::from(rng.gen_range(low..high))).collect()
}
