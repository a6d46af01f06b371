use rand::rngs::StdRng;
use rand::SeedableRng;

use super::synthetic::{self, TrainingSet};
use super::{Classifier, ModelParameters, StandardScaler};
use crate::config::RiskModelConfig;
use crate::error::ModelError;
use crate::models::RiskCategory;

/// Fit model parameters on the synthetic corpus for `config.seed`.
pub fn train(config: &RiskModelConfig) -> Result<ModelParameters, ModelError> {
    let data = synthetic::generate(config.seed, config.n_samples);
    train_on(&data, config)
}

/// Fit model parameters on an explicit training set.
pub fn train_on(data: &TrainingSet, config: &RiskModelConfig) -> Result<ModelParameters, ModelError> {
    let counts = data.class_counts();
    if let Some(missing) = RiskCategory::ALL.iter().find(|c| counts[c.index()] == 0) {
        return Err(ModelError::DegenerateTrainingSet(format!(
            "no {missing} samples among {}",
            data.samples.len()
        )));
    }

    let scaler = StandardScaler::fit(&data.samples)?;
    let scaled: Vec<_> = data.samples.iter().map(|row| scaler.transform(row)).collect();
    let labels = data.label_indices();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let classifier = Classifier::fit(config, &scaled, &labels, &mut rng)?;

    tracing::info!(
        kind = %config.kind,
        seed = config.seed,
        samples = data.samples.len(),
        low = counts[0],
        moderate = counts[1],
        high = counts[2],
        "risk model trained"
    );

    Ok(ModelParameters {
        seed: config.seed,
        trained_on: data.samples.len(),
        scaler,
        classifier,
    })
}
