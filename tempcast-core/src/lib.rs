//! Core library for the `tempcast` temperature prediction service.
//!
//! This crate defines:
//! - Configuration handling
//! - Feature extraction from weather observations
//! - Synthetic training data and the random-forest training pipeline
//! - The shared model state and the prediction service facade
//!
//! It has no HTTP or async code; `tempcast-cli` adapts it to a CLI and a REST API.

pub mod config;
pub mod error;
pub mod features;
pub mod learn;
pub mod model;
pub mod service;
pub mod state;
pub mod synthetic;
pub mod trainer;

pub use config::{Config, ModelConfig, ServerConfig, TimeBasis};
pub use error::{PredictionError, TrainingError};
pub use features::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
pub use model::{ConfidenceLevel, HealthStatus, ModelStatus, PredictionResult, WeatherObservation};
pub use service::{DEFAULT_HOURS_AHEAD, PredictionService};
pub use state::ModelState;
pub use trainer::{FittedModel, Trainer, TrainingReport};
