use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};

/// Per-feature z-score standardization.
///
/// Uses the population standard deviation; constant features get unit scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    pub fn fit(samples: &[[f64; FEATURE_COUNT]]) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::DegenerateTrainingSet(
                "cannot fit a scaler on zero samples".to_string(),
            ));
        }

        let n = samples.len() as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        for sample in samples {
            for (acc, value) in mean.iter_mut().zip(sample) {
                *acc += value;
            }
        }
        for value in mean.iter_mut() {
            *value /= n;
        }

        let mut scale = [0.0; FEATURE_COUNT];
        for sample in samples {
            for j in 0..FEATURE_COUNT {
                let d = sample[j] - mean[j];
                scale[j] += d * d;
            }
        }
        for value in scale.iter_mut() {
            let std = (*value / n).sqrt();
            *value = if std > f64::EPSILON { std } else { 1.0 };
        }

        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn transform(&self, sample: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for j in 0..FEATURE_COUNT {
            out[j] = (sample[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        for j in 0..FEATURE_COUNT {
            if !self.mean[j].is_finite() || !(self.scale[j].is_finite() && self.scale[j] > 0.0) {
                return Err(ModelError::InvalidParameters(format!(
                    "scaler entry for {} is not usable",
                    FEATURE_NAMES[j]
                )));
            }
        }
        Ok(())
    }
}
