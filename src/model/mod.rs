pub mod forest;
pub mod logistic;
pub mod scaler;
pub mod synthetic;
pub mod trainer;

use std::path::Path;
use std::str::FromStr;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::RiskModelConfig;
use crate::error::ModelError;
use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::models::RiskProbabilities;

pub use forest::{ForestParams, RandomForest};
pub use logistic::{LogisticParams, SoftmaxRegression};
pub use scaler::StandardScaler;

/// Output classes, indexed by [`crate::models::RiskCategory::index`].
pub const CLASS_COUNT: usize = 3;

/// A classifier that can be fitted on labeled rows.
pub trait Trainable: Sized {
    type Params;

    fn fit(
        samples: &[[f64; FEATURE_COUNT]],
        labels: &[usize],
        params: &Self::Params,
        rng: &mut StdRng,
    ) -> Result<Self, ModelError>;
}

/// A fitted classifier producing class probabilities.
pub trait ProbabilisticClassifier: Send + Sync {
    fn predict_proba(&self, sample: &[f64; FEATURE_COUNT]) -> [f64; CLASS_COUNT];

    /// Check that deserialized or freshly fitted state is usable.
    fn validate(&self) -> Result<(), ModelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    RandomForest,
    Logistic,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::Logistic => "logistic",
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" | "forest" => Ok(ModelKind::RandomForest),
            "logistic" | "softmax" => Ok(ModelKind::Logistic),
            other => Err(format!(
                "unknown model kind {other:?} (expected random_forest or logistic)"
            )),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "snake_case")]
pub enum Classifier {
    RandomForest(RandomForest),
    Logistic(SoftmaxRegression),
}

impl Classifier {
    /// Fit the variant named by `config.kind`.
    pub fn fit(
        config: &RiskModelConfig,
        samples: &[[f64; FEATURE_COUNT]],
        labels: &[usize],
        rng: &mut StdRng,
    ) -> Result<Self, ModelError> {
        match config.kind {
            ModelKind::RandomForest => {
                RandomForest::fit(samples, labels, &config.forest, rng).map(Classifier::RandomForest)
            }
            ModelKind::Logistic => {
                SoftmaxRegression::fit(samples, labels, &config.logistic, rng).map(Classifier::Logistic)
            }
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Classifier::RandomForest(_) => ModelKind::RandomForest,
            Classifier::Logistic(_) => ModelKind::Logistic,
        }
    }

    fn inner(&self) -> &dyn ProbabilisticClassifier {
        match self {
            Classifier::RandomForest(model) => model,
            Classifier::Logistic(model) => model,
        }
    }
}

impl ProbabilisticClassifier for Classifier {
    fn predict_proba(&self, sample: &[f64; FEATURE_COUNT]) -> [f64; CLASS_COUNT] {
        self.inner().predict_proba(sample)
    }

    fn validate(&self) -> Result<(), ModelError> {
        self.inner().validate()
    }
}

/// Everything needed to rebuild a predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub seed: u64,
    pub trained_on: usize,
    pub scaler: StandardScaler,
    pub classifier: Classifier,
}

impl ModelParameters {
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.scaler.validate()?;
        self.classifier.validate()
    }
}

/// Read-only risk inference over fitted parameters.
#[derive(Debug, Clone)]
pub struct RiskPredictor {
    params: ModelParameters,
}

impl RiskPredictor {
    pub fn from_parameters(params: ModelParameters) -> Result<Self, ModelError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Train on the synthetic corpus described by `config` and wrap the result.
    pub fn bootstrap(config: &RiskModelConfig) -> Result<Self, ModelError> {
        Self::from_parameters(trainer::train(config)?)
    }

    pub fn kind(&self) -> ModelKind {
        self.params.classifier.kind()
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.params
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<RiskProbabilities, ModelError> {
        if let Some(idx) = features.first_non_finite() {
            return Err(ModelError::MalformedFeatures(format!(
                "{} is not a finite number",
                FEATURE_NAMES[idx]
            )));
        }

        let scaled = self.params.scaler.transform(features.as_array());
        let proba = self.params.classifier.predict_proba(&scaled);
        if proba.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ModelError::InvalidParameters(
                "classifier produced invalid probabilities".to_string(),
            ));
        }

        Ok(RiskProbabilities::from_model_output(proba))
    }
}

pub(crate) fn softmax(logits: [f64; CLASS_COUNT]) -> [f64; CLASS_COUNT] {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = logits.map(|logit| (logit - max).exp());
    let total: f64 = exps.iter().sum();
    exps.map(|value| value / total)
}

pub(crate) fn check_training_input(
    samples: &[[f64; FEATURE_COUNT]],
    labels: &[usize],
) -> Result<(), ModelError> {
    if samples.is_empty() {
        return Err(ModelError::DegenerateTrainingSet("no samples".to_string()));
    }
    if samples.len() != labels.len() {
        return Err(ModelError::DegenerateTrainingSet(format!(
            "{} samples but {} labels",
            samples.len(),
            labels.len()
        )));
    }
    if labels.iter().any(|label| *label >= CLASS_COUNT) {
        return Err(ModelError::DegenerateTrainingSet("label out of range".to_string()));
    }
    if samples.iter().flatten().any(|value| !value.is_finite()) {
        return Err(ModelError::DegenerateTrainingSet(
            "non-finite feature value".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentSignals;

    #[test]
    fn softmax_is_a_distribution() {
        let p = softmax([1000.0, 0.0, -1000.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[0] > 0.99);
    }

    #[test]
    fn model_kind_parses_aliases() {
        assert_eq!("random-forest".parse::<ModelKind>(), Ok(ModelKind::RandomForest));
        assert_eq!("Logistic".parse::<ModelKind>(), Ok(ModelKind::Logistic));
        assert!("tabpfn".parse::<ModelKind>().is_err());
    }

    #[test]
    fn predictor_rejects_non_finite_features() {
        let predictor = RiskPredictor::bootstrap(&RiskModelConfig::default()).unwrap();
        let mut features = crate::features::extract(&StudentSignals::default(), None);
        features.0[3] = f64::NAN;

        match predictor.predict(&features) {
            Err(ModelError::MalformedFeatures(msg)) => assert!(msg.contains("mood_score")),
            other => panic!("expected malformed features, got {other:?}"),
        }
    }

    #[test]
    fn parameters_round_trip_through_json() {
        let config = RiskModelConfig {
            kind: ModelKind::Logistic,
            ..RiskModelConfig::default()
        };
        let predictor = RiskPredictor::bootstrap(&config).unwrap();
        let json = predictor.parameters().to_json().unwrap();
        let restored: ModelParameters = serde_json::from_str(&json).unwrap();
        let restored = RiskPredictor::from_parameters(restored).unwrap();

        let features = crate::features::extract(&StudentSignals::default(), None);
        let a = predictor.predict(&features).unwrap();
        let b = restored.predict(&features).unwrap();
        assert!((a.high - b.high).abs() < 1e-12);
        assert_eq!(restored.kind(), ModelKind::Logistic);
    }

    #[test]
    fn loads_parameters_from_file() {
        let predictor = RiskPredictor::bootstrap(&RiskModelConfig {
            forest: ForestParams {
                n_trees: 5,
                ..ForestParams::default()
            },
            ..RiskModelConfig::default()
        })
        .unwrap();
        let path = std::env::temp_dir().join(format!("risk-model-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, predictor.parameters().to_json().unwrap()).unwrap();

        let loaded = ModelParameters::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let loaded = RiskPredictor::from_parameters(loaded).unwrap();

        let features = crate::features::extract(&StudentSignals::default(), None);
        let a = predictor.predict(&features).unwrap();
        let b = loaded.predict(&features).unwrap();
        assert!((a.moderate - b.moderate).abs() < 1e-9);
        assert_eq!(loaded.parameters().trained_on, predictor.parameters().trained_on);
    }
}
