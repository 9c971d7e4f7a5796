use crate::error::TrainingError;

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64, TrainingError> {
    if actual.len() != predicted.len() {
        return Err(TrainingError::ShapeMismatch { expected: actual.len(), got: predicted.len() });
    }
    if actual.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual.iter().zip(predicted).map(|(y, p)| (y - p).powi(2)).sum();

    if !(ss_tot.is_finite() && ss_res.is_finite()) {
        return Err(TrainingError::NonFinite);
    }

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }

    Ok(1.0 - ss_res / ss_tot)
}
