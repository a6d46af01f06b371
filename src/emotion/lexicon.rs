//! Weighted-lexicon emotion model.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use super::{EmotionScore, TextClassifier, NEUTRAL};
use crate::error::InferenceError;

pub const LABELS: [&str; 7] = [
    "anger", "disgust", "fear", "joy", "neutral", "sadness", "surprise",
];

const NEGATORS: [&str; 12] = [
    "not", "no", "never", "don't", "didn't", "doesn't", "isn't", "wasn't", "can't", "cannot",
    "hardly", "won't",
];

const DEFAULT_NEUTRAL_BIAS: f64 = 1.0;
const DEFAULT_TEMPERATURE: f64 = 1.0;

#[rustfmt::skip]
const DEFAULT_WEIGHTS: &[(&str, &str, f64)] = &[
    ("angry", "anger", 2.5), ("furious", "anger", 3.0), ("mad", "anger", 2.0),
    ("annoyed", "anger", 1.8), ("irritated", "anger", 1.8), ("frustrated", "anger", 2.0),
    ("frustrating", "anger", 1.8), ("rage", "anger", 3.0), ("hate", "anger", 2.5),
    ("unfair", "anger", 1.5), ("resent", "anger", 2.2), ("outraged", "anger", 3.0),
    ("hostile", "anger", 2.0),
    ("disgusted", "disgust", 3.0), ("disgusting", "disgust", 3.0), ("gross", "disgust", 2.5),
    ("revolting", "disgust", 3.0), ("nasty", "disgust", 2.0), ("repulsed", "disgust", 3.0),
    ("awful", "disgust", 1.2), ("yuck", "disgust", 2.5),
    ("afraid", "fear", 2.5), ("scared", "fear", 2.5), ("anxious", "fear", 2.2),
    ("anxiety", "fear", 2.2), ("worried", "fear", 2.0), ("worry", "fear", 1.8),
    ("nervous", "fear", 2.0), ("terrified", "fear", 3.0), ("panic", "fear", 2.8),
    ("fear", "fear", 2.5), ("dread", "fear", 2.5), ("stressed", "fear", 1.8),
    ("overwhelmed", "fear", 1.8), ("uncertain", "fear", 1.2),
    ("happy", "joy", 2.5), ("glad", "joy", 2.0), ("excited", "joy", 2.5),
    ("great", "joy", 1.5), ("wonderful", "joy", 2.5), ("love", "joy", 2.0),
    ("proud", "joy", 2.2), ("enjoy", "joy", 2.0), ("enjoyed", "joy", 2.0),
    ("fun", "joy", 1.8), ("grateful", "joy", 2.2), ("amazing", "joy", 2.5),
    ("good", "joy", 1.0), ("relieved", "joy", 1.5), ("awesome", "joy", 2.5),
    ("cheerful", "joy", 2.5), ("joy", "joy", 2.5),
    ("sad", "sadness", 2.5), ("lonely", "sadness", 2.5), ("depressed", "sadness", 3.0),
    ("unhappy", "sadness", 2.5), ("cry", "sadness", 2.5), ("crying", "sadness", 2.5),
    ("cried", "sadness", 2.5), ("miss", "sadness", 1.5), ("hopeless", "sadness", 3.0),
    ("tired", "sadness", 1.2), ("empty", "sadness", 1.8), ("worthless", "sadness", 3.0),
    ("failed", "sadness", 1.8), ("lost", "sadness", 1.5), ("alone", "sadness", 2.0),
    ("heartbroken", "sadness", 3.0), ("disappointed", "sadness", 2.0), ("miserable", "sadness", 3.0),
    ("surprised", "surprise", 2.5), ("shocked", "surprise", 2.5), ("unexpected", "surprise", 2.0),
    ("suddenly", "surprise", 1.2), ("amazed", "surprise", 2.2), ("wow", "surprise", 2.0),
    ("astonished", "surprise", 2.8), ("unbelievable", "surprise", 1.8),
    ("okay", "neutral", 1.0), ("fine", "neutral", 1.0), ("normal", "neutral", 1.0),
    ("usual", "neutral", 1.0),
];

/// Lexicon weights and softmax settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconModel {
    labels: Vec<String>,
    #[serde(default = "default_neutral_bias")]
    neutral_bias: f64,
    #[serde(default = "default_temperature")]
    temperature: f64,
    /// token -> label -> weight
    words: BTreeMap<String, BTreeMap<String, f64>>,
}

fn default_neutral_bias() -> f64 {
    DEFAULT_NEUTRAL_BIAS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl Default for LexiconModel {
    fn default() -> Self {
        let mut words: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for (word, label, weight) in DEFAULT_WEIGHTS {
            words
                .entry((*word).to_string())
                .or_default()
                .insert((*label).to_string(), *weight);
        }

        Self {
            labels: LABELS.iter().map(|label| label.to_string()).collect(),
            neutral_bias: DEFAULT_NEUTRAL_BIAS,
            temperature: DEFAULT_TEMPERATURE,
            words,
        }
    }
}

impl LexiconModel {
    /// Load weights from a JSON file.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lexicon {}", path.display()))?;
        let model: LexiconModel = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse lexicon {}", path.display()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.labels.is_empty() {
            bail!("lexicon declares no labels");
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            bail!("lexicon temperature must be a finite positive number");
        }
        for (word, weights) in &self.words {
            for (label, weight) in weights {
                if !self.labels.contains(label) {
                    bail!("word {word:?} references unknown label {label:?}");
                }
                if !weight.is_finite() {
                    bail!("word {word:?} has a non-finite weight");
                }
            }
        }
        Ok(())
    }

    fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|known| known == label)
    }

    fn logits(&self, text: &str) -> Vec<f64> {
        let mut logits = vec![0.0; self.labels.len()];
        let neutral = self.label_index(NEUTRAL);
        if let Some(idx) = neutral {
            logits[idx] += self.neutral_bias;
        }

        let mut negated = false;
        for token in tokenize(text) {
            if NEGATORS.contains(&token.as_str()) {
                negated = true;
                continue;
            }
            if let Some(weights) = self.words.get(&token) {
                for (label, weight) in weights {
                    // A negated cue stops signalling its emotion; its mass goes to neutral.
                    let target = if negated { neutral } else { self.label_index(label) };
                    if let Some(idx) = target {
                        logits[idx] += weight;
                    }
                }
            }
            negated = false;
        }

        logits
    }
}

impl TextClassifier for LexiconModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn classify(&self, text: &str) -> Result<Vec<EmotionScore>, InferenceError> {
        let logits = self.logits(text);
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(InferenceError::invalid_output("non-finite logits"));
        }

        let exps: Vec<f64> = logits
            .iter()
            .map(|logit| ((logit - max) / self.temperature).exp())
            .collect();
        let total: f64 = exps.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(InferenceError::invalid_output("softmax normalizer is not positive"));
        }

        Ok(self
            .labels
            .iter()
            .zip(exps)
            .map(|(label, value)| EmotionScore::new(label.clone(), value / total))
            .collect())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionClassifier;

    fn analyze(text: &str) -> crate::emotion::EmotionResult {
        EmotionClassifier::new(LexiconModel::default()).analyze(text)
    }

    #[test]
    fn joyful_entry_is_joy() {
        let result = analyze("I am so happy and excited about my exam results!");
        assert_eq!(result.primary_emotion, "joy");
        assert!(result.confidence > 0.5);
    }

    #[test]
    fn lonely_entry_is_sadness() {
        let result = analyze("I feel lonely and hopeless these days");
        assert_eq!(result.primary_emotion, "sadness");
        assert!(result.confidence > 0.5);
    }

    #[test]
    fn exam_worries_are_fear() {
        let result = analyze("Really anxious and scared about the finals");
        assert_eq!(result.primary_emotion, "fear");
    }

    #[test]
    fn text_without_cues_is_low_confidence_neutral() {
        let result = analyze("Went to the library and then had lunch");
        assert_eq!(result.primary_emotion, "neutral");
        assert!(result.confidence < 0.5);
    }

    #[test]
    fn negation_suppresses_cue() {
        let result = analyze("I'm not happy");
        assert_eq!(result.primary_emotion, "neutral");
    }

    #[test]
    fn distribution_covers_vocabulary_and_sums_to_one() {
        let scores = LexiconModel::default().classify("wow, what a day").unwrap();
        assert_eq!(scores.len(), LABELS.len());
        let total: f64 = scores.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tokenizer_handles_punctuation_and_curly_quotes() {
        assert_eq!(
            tokenize("Can\u{2019}t sleep... SO tired!"),
            vec!["can't", "sleep", "so", "tired"]
        );
    }

    #[test]
    fn rejects_lexicon_with_unknown_label() {
        let mut model = LexiconModel::default();
        model
            .words
            .entry("meh".to_string())
            .or_default()
            .insert("boredom".to_string(), 1.0);
        assert!(model.validate().is_err());
    }

    #[test]
    fn loads_lexicon_from_json_file() {
        let path = std::env::temp_dir().join(format!("lexicon-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"labels": ["happiness", "neutral"], "words": {"yay": {"happiness": 4.0}}}"#,
        )
        .unwrap();

        let model = LexiconModel::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let result = EmotionClassifier::new(model).analyze("yay");
        assert_eq!(result.primary_emotion, "happiness");
    }
}
