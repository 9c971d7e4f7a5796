use thiserror::Error;

/// Failure while generating data, scaling or fitting the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainingError {
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("Training dataset is empty")]
    EmptyDataset,

    #[error("Dataset shape mismatch: expected {expected} rows, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("Invalid sampling distribution: {0}")]
    Distribution(String),

    #[error("Training produced a non-finite value")]
    NonFinite,
}

/// Failure while turning an observation into a prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[source] TrainingError),

    #[error("Model produced a non-finite prediction ({0})")]
    NonFinite(f64),
}

impl From<TrainingError> for PredictionError {
    fn from(err: TrainingError) -> Self {
        PredictionError::ModelUnavailable(err)
    }
}
