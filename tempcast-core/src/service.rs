use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    config::{Config, ModelConfig, TimeBasis},
    error::{PredictionError, TrainingError},
    features::{self, FEATURE_COUNT},
    learn::Regressor,
    model::{ConfidenceLevel, HealthStatus, ModelStatus, PredictionResult, WeatherObservation},
    state::ModelState,
    trainer::{FittedModel, Trainer, TrainingReport},
};

pub const MODEL_TYPE: &str = "RandomForestRegressor";
pub const SERVICE_NAME: &str = "Weather Prediction Service";
pub const DEFAULT_HOURS_AHEAD: f64 = 24.0;

/// Coordinates training and prediction over a shared [`ModelState`].
#[derive(Debug)]
pub struct PredictionService {
    state: Arc<ModelState>,
    trainer: Trainer,
    time_basis: TimeBasis,
    uncertainty: f64,
    training: Mutex<()>,
}

impl PredictionService {
    pub fn new(model: ModelConfig, time_basis: TimeBasis, state: Arc<ModelState>) -> Self {
        Self {
            state,
            // Clamped so `min <= point <= max` always holds.
            uncertainty: model.uncertainty.max(0.0),
            trainer: Trainer::new(model),
            time_basis,
            training: Mutex::new(()),
        }
    }

    /// Service with a fresh, untrained state.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.model.clone(), config.time_basis, Arc::new(ModelState::new()))
    }

    pub fn state(&self) -> &Arc<ModelState> {
        &self.state
    }

    /// Fit a new model and install it, replacing any previous one.
    pub fn train(&self) -> Result<TrainingReport, TrainingError> {
        let _guard = self.training.lock();
        self.train_locked().map(|model| model.report().clone())
    }

    /// Current model, training one first if none is installed.
    pub fn ensure_trained(&self) -> Result<Arc<FittedModel>, TrainingError> {
        if let Some(model) = self.state.snapshot() {
            return Ok(model);
        }

        let _guard = self.training.lock();
        // Another caller may have finished training while we waited.
        if let Some(model) = self.state.snapshot() {
            return Ok(model);
        }
        tracing::info!("No trained model yet, training before first prediction");
        self.train_locked()
    }

    fn train_locked(&self) -> Result<Arc<FittedModel>, TrainingError> {
        tracing::info!(
            samples = self.trainer.config().n_samples,
            trees = self.trainer.config().n_estimators,
            "Training model"
        );
        match self.trainer.train() {
            Ok(model) => {
                let model = self.state.install(model);
                tracing::info!(generation = model.generation(), "Installed trained model");
                Ok(model)
            }
            Err(err) => {
                tracing::error!(error = %err, "Error training model");
                Err(err)
            }
        }
    }

    pub fn predict(
        &self,
        observation: &WeatherObservation,
        hours_ahead: f64,
    ) -> Result<PredictionResult, PredictionError> {
        self.predict_at(observation, hours_ahead, Utc::now())
    }

    /// Predict as if the request arrived at `now`.
    pub fn predict_at(
        &self,
        observation: &WeatherObservation,
        hours_ahead: f64,
        now: DateTime<Utc>,
    ) -> Result<PredictionResult, PredictionError> {
        let model = self.ensure_trained()?;

        let features = features::extract(observation, self.time_basis.wall_clock(now));
        let scaled = model.scaler().transform(&features);
        let raw = model.forest().predict(&scaled);

        if !raw.is_finite() {
            tracing::error!(prediction = raw, "Error making prediction");
            return Err(PredictionError::NonFinite(raw));
        }

        let predicted_temperature = round1(raw);
        tracing::debug!(
            predicted_temperature,
            hours_ahead,
            generation = model.generation(),
            "Prediction made"
        );

        Ok(PredictionResult {
            predicted_temperature,
            confidence_min: round1(predicted_temperature - self.uncertainty),
            confidence_max: round1(predicted_temperature + self.uncertainty),
            hours_ahead,
            prediction_time: now,
            model_confidence: ConfidenceLevel::Medium,
        })
    }

    pub fn status(&self) -> ModelStatus {
        let model = self.state.snapshot();
        ModelStatus {
            is_trained: model.is_some(),
            model_type: MODEL_TYPE.to_string(),
            features: FEATURE_COUNT,
            last_updated: Utc::now(),
            generation: model.as_ref().map(|m| m.generation()),
            train_score: model.as_ref().map(|m| m.report().train_score),
            test_score: model.as_ref().map(|m| m.report().test_score),
            trained_at: model.as_ref().map(|m| m.trained_at()),
        }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "OK".to_string(),
            service: SERVICE_NAME.to_string(),
            timestamp: Utc::now(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
