use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{softmax, ProbabilisticClassifier, Trainable, CLASS_COUNT};
use crate::error::ModelError;
use crate::features::FEATURE_COUNT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.1,
            l2: 1e-3,
        }
    }
}

/// Weights are fitted by full-batch gradient descent from zero, so the
/// result depends only on the data and the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    weights: [[f64; FEATURE_COUNT]; CLASS_COUNT],
    bias: [f64; CLASS_COUNT],
}

impl SoftmaxRegression {
    fn logits(&self, sample: &[f64; FEATURE_COUNT]) -> [f64; CLASS_COUNT] {
        let mut logits = self.bias;
        for (logit, row) in logits.iter_mut().zip(&self.weights) {
            *logit += row.iter().zip(sample).map(|(w, x)| w * x).sum::<f64>();
        }
        logits
    }
}

impl Trainable for SoftmaxRegression {
    type Params = LogisticParams;

    fn fit(
        samples: &[[f64; FEATURE_COUNT]],
        labels: &[usize],
        params: &LogisticParams,
        _rng: &mut StdRng,
    ) -> Result<Self, ModelError> {
        if !(params.learning_rate.is_finite() && params.learning_rate > 0.0) {
            return Err(ModelError::InvalidParameters(
                "learning_rate must be a finite positive number".to_string(),
            ));
        }
        if !(params.l2.is_finite() && params.l2 >= 0.0) {
            return Err(ModelError::InvalidParameters("l2 must be >= 0".to_string()));
        }
        super::check_training_input(samples, labels)?;

        let n = samples.len() as f64;
        let mut model = Self {
            weights: [[0.0; FEATURE_COUNT]; CLASS_COUNT],
            bias: [0.0; CLASS_COUNT],
        };

        for _ in 0..params.epochs {
            let mut grad_w = [[0.0; FEATURE_COUNT]; CLASS_COUNT];
            let mut grad_b = [0.0; CLASS_COUNT];

            for (sample, &label) in samples.iter().zip(labels) {
                let proba = softmax(model.logits(sample));
                for k in 0..CLASS_COUNT {
                    let target = if k == label { 1.0 } else { 0.0 };
                    let err = proba[k] - target;
                    grad_b[k] += err;
                    for j in 0..FEATURE_COUNT {
                        grad_w[k][j] += err * sample[j];
                    }
                }
            }

            for k in 0..CLASS_COUNT {
                model.bias[k] -= params.learning_rate * grad_b[k] / n;
                for j in 0..FEATURE_COUNT {
                    let grad = grad_w[k][j] / n + params.l2 * model.weights[k][j];
                    model.weights[k][j] -= params.learning_rate * grad;
                }
            }
        }

        Ok(model)
    }
}

impl ProbabilisticClassifier for SoftmaxRegression {
    fn predict_proba(&self, sample: &[f64; FEATURE_COUNT]) -> [f64; CLASS_COUNT] {
        softmax(self.logits(sample))
    }

    fn validate(&self) -> Result<(), ModelError> {
        let finite = self.bias.iter().all(|b| b.is_finite())
            && self.weights.iter().flatten().all(|w| w.is_finite());
        if finite {
            Ok(())
        } else {
            Err(ModelError::InvalidParameters(
                "softmax weights must be finite".to_string(),
            ))
        }
    }
}
