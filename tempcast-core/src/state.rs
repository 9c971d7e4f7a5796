use std::sync::Arc;

use parking_lot::RwLock;

use crate::trainer::FittedModel;

/// Holder of the currently installed model.
///
/// Readers take an `Arc` snapshot and drop the lock before using it, so a
/// scaler is always paired with the forest it was fitted with.
#[derive(Debug, Default)]
pub struct ModelState {
    current: RwLock<Option<Arc<FittedModel>>>,
}

impl ModelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_trained(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn snapshot(&self) -> Option<Arc<FittedModel>> {
        self.current.read().clone()
    }

    /// Replace the current model, stamping it with the next generation number.
    pub fn install(&self, mut model: FittedModel) -> Arc<FittedModel> {
        let mut current = self.current.write();
        model.generation = current.as_ref().map_or(1, |m| m.generation + 1);
        let model = Arc::new(model);
        *current = Some(Arc::clone(&model));
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        features::{FEATURE_COUNT, FeatureVector},
        learn::{RandomForest, RegressionTree, Regressor, StandardScaler},
        trainer::TrainingReport,
    };
    use std::{thread, time::Duration};

    /// Scaler mean and forest output both encode `tag`.
    fn sentinel(tag: f64) -> FittedModel {
        let scaler = StandardScaler::from_parts([tag; FEATURE_COUNT], [1.0; FEATURE_COUNT]);
        let forest =
            RandomForest::from_trees(vec![RegressionTree::constant(tag)]).expect("forest");
        let report = TrainingReport {
            train_score: tag,
            test_score: tag,
            train_rows: 0,
            test_rows: 0,
            elapsed: Duration::ZERO,
        };
        FittedModel::new(scaler, forest, report)
    }

    #[test]
    fn starts_untrained() {
        let state = ModelState::new();
        assert!(!state.is_trained());
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn install_replaces_and_numbers_generations() {
        let state = ModelState::new();

        let first = state.install(sentinel(1.0));
        assert!(state.is_trained());
        assert_eq!(first.generation(), 1);

        let second = state.install(sentinel(2.0));
        assert_eq!(second.generation(), 2);

        let current = state.snapshot().expect("installed");
        assert_eq!(current.generation(), 2);
        assert_eq!(current.scaler().mean()[0], 2.0);
        // Old snapshot holders keep their own model.
        assert_eq!(first.scaler().mean()[0], 1.0);
    }

    #[test]
    fn readers_never_see_mixed_generations() {
        let state = Arc::new(ModelState::new());
        state.install(sentinel(0.0));

        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for tag in 1..=500 {
                    state.install(sentinel(f64::from(tag)));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    let probe = FeatureVector::new([0.0; FEATURE_COUNT]);
                    for _ in 0..2_000 {
                        let model = state.snapshot().expect("installed before readers start");
                        let scaler_tag = model.scaler().mean()[0];
                        let forest_tag = model.forest().predict(&probe);
                        assert_eq!(scaler_tag, forest_tag);
                        assert_eq!(model.generation(), scaler_tag as u64 + 1);
                    }
                })
            })
            .collect();

        writer.join().expect("writer thread");
        for reader in readers {
            reader.join().expect("reader thread");
        }
        assert_eq!(state.snapshot().expect("installed").generation(), 501);
    }
}
