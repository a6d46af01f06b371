pub mod lexicon;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;
use crate::models::round_to;

pub use lexicon::LexiconModel;

/// Default cap on input length, in characters.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 512;

pub const NEUTRAL: &str = "neutral";
pub const ERROR: &str = "error";

/// One `(label, score)` pair of an emotion distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    #[serde(rename = "emotion")]
    pub label: String,
    pub score: f64,
}

impl EmotionScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Output of [`EmotionClassifier::analyze`].
///
/// Serializes to the `{emotion, score, all_emotions, error?}` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    #[serde(rename = "emotion", default = "neutral_label")]
    pub primary_emotion: String,
    #[serde(rename = "score", default)]
    pub confidence: f64,
    #[serde(rename = "all_emotions", default)]
    pub distribution: Vec<EmotionScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn neutral_label() -> String {
    NEUTRAL.to_string()
}

impl EmotionResult {
    /// Result for empty input or a backend that produced no labels.
    pub fn neutral() -> Self {
        Self {
            primary_emotion: neutral_label(),
            confidence: 0.0,
            distribution: Vec::new(),
            error: None,
        }
    }

    /// Soft-fail result carrying the failure message.
    pub fn failed(error: &InferenceError) -> Self {
        Self {
            primary_emotion: ERROR.to_string(),
            confidence: 0.0,
            distribution: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Normalize raw backend scores into a result.
    ///
    /// Labels are lowercased, the distribution is sorted descending with ties
    /// kept in backend order, and scores are rounded to 4 decimals.
    pub fn from_scores(scores: Vec<EmotionScore>) -> Result<Self, InferenceError> {
        if let Some(bad) = scores
            .iter()
            .find(|entry| !entry.score.is_finite() || entry.score < 0.0)
        {
            return Err(InferenceError::invalid_output(format!(
                "score {} for label {:?}",
                bad.score, bad.label
            )));
        }

        let mut distribution: Vec<EmotionScore> = scores
            .into_iter()
            .map(|entry| EmotionScore::new(entry.label.to_lowercase(), entry.score))
            .collect();
        distribution.sort_by(|a, b| b.score.total_cmp(&a.score));
        for entry in distribution.iter_mut() {
            entry.score = round_to(entry.score, 4);
        }

        let Some(primary) = distribution.first() else {
            return Ok(Self::neutral());
        };

        Ok(Self {
            primary_emotion: primary.label.clone(),
            confidence: primary.score,
            distribution,
            error: None,
        })
    }

    /// Build a distribution-only result from explicitly supplied scores.
    ///
    /// There is no classifier verdict behind these, so the primary emotion
    /// stays neutral with zero confidence.
    pub fn from_explicit_scores(scores: &EmotionScores) -> Self {
        let mut distribution = vec![
            EmotionScore::new("joy", scores.joy),
            EmotionScore::new("sadness", scores.sadness),
            EmotionScore::new("anger", scores.anger),
            EmotionScore::new("fear", scores.fear),
        ];
        distribution.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self {
            distribution,
            ..Self::neutral()
        }
    }

    /// Score for `label`, matched exactly but case-insensitively.
    ///
    /// When a label appears twice the later entry wins.
    pub fn score_for(&self, label: &str) -> Option<f64> {
        self.distribution
            .iter()
            .rev()
            .find(|entry| entry.label.eq_ignore_ascii_case(label))
            .map(|entry| entry.score)
    }

    /// True when the result came from a successful classification.
    pub fn is_usable(&self) -> bool {
        self.error.is_none() && !self.distribution.is_empty()
    }
}

/// Per-emotion scores supplied directly by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores {
    pub joy: f64,
    pub sadness: f64,
    pub anger: f64,
    pub fear: f64,
}

/// A multi-class text classifier producing raw `(label, score)` pairs.
///
/// Implementations are shared across threads and must not mutate state
/// during classification.
pub trait TextClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, text: &str) -> Result<Vec<EmotionScore>, InferenceError>;
}

pub struct EmotionClassifier {
    backend: Box<dyn TextClassifier>,
    max_chars: usize,
}

impl fmt::Debug for EmotionClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmotionClassifier")
            .field("backend", &self.backend.name())
            .field("max_chars", &self.max_chars)
            .finish()
    }
}

impl EmotionClassifier {
    pub fn new(backend: impl TextClassifier + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            max_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Classify `text`. Never fails; see the module docs for degraded results.
    pub fn analyze(&self, text: &str) -> EmotionResult {
        if text.trim().is_empty() {
            return EmotionResult::neutral();
        }

        let input = truncate_chars(text, self.max_chars);
        let outcome = self
            .backend
            .classify(input)
            .and_then(EmotionResult::from_scores);

        match outcome {
            Ok(result) => {
                tracing::debug!(
                    backend = self.backend.name(),
                    emotion = %result.primary_emotion,
                    confidence = result.confidence,
                    "text classified"
                );
                result
            }
            Err(err) => {
                tracing::error!(backend = self.backend.name(), error = %err, "emotion analysis failed");
                EmotionResult::failed(&err)
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    struct FixedBackend(Vec<EmotionScore>);

    impl TextClassifier for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn classify(&self, _text: &str) -> Result<Vec<EmotionScore>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    impl TextClassifier for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn classify(&self, _text: &str) -> Result<Vec<EmotionScore>, InferenceError> {
            Err(InferenceError::backend("tokenizer exploded"))
        }
    }

    struct RecordingBackend(Arc<Mutex<Vec<String>>>);

    impl TextClassifier for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        fn classify(&self, text: &str) -> Result<Vec<EmotionScore>, InferenceError> {
            if let Ok(mut seen) = self.0.lock() {
                seen.push(text.to_string());
            }
            Ok(vec![EmotionScore::new("joy", 1.0)])
        }
    }

    #[test]
    fn empty_text_is_neutral_without_calling_backend() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let classifier = EmotionClassifier::new(RecordingBackend(seen.clone()));

        for text in ["", "   ", "\n\t"] {
            let result = classifier.analyze(text);
            assert_eq!(result.primary_emotion, "neutral");
            assert_eq!(result.confidence, 0.0);
            assert!(result.distribution.is_empty());
            assert!(result.error.is_none());
        }
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_text_serializes_to_neutral_record() {
        let classifier = EmotionClassifier::new(FailingBackend);
        let value = serde_json::to_value(classifier.analyze("")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"emotion": "neutral", "score": 0.0, "all_emotions": []})
        );
    }

    #[test]
    fn backend_failure_becomes_error_result() {
        let classifier = EmotionClassifier::new(FailingBackend);
        let result = classifier.analyze("today was rough");

        assert_eq!(result.primary_emotion, "error");
        assert_eq!(result.confidence, 0.0);
        assert!(result.distribution.is_empty());
        assert!(result.error.as_deref().unwrap().contains("tokenizer exploded"));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["emotion"], "error");
        assert_eq!(value["all_emotions"], serde_json::json!([]));
        assert!(value["error"].is_string());
    }

    #[test]
    fn labels_are_lowercased_and_sorted() {
        let classifier = EmotionClassifier::new(FixedBackend(vec![
            EmotionScore::new("Joy", 0.1),
            EmotionScore::new("SADNESS", 0.7),
            EmotionScore::new("Fear", 0.2),
        ]));
        let result = classifier.analyze("hello");

        assert_eq!(result.primary_emotion, "sadness");
        assert_eq!(result.confidence, 0.7);
        let labels: Vec<&str> = result.distribution.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["sadness", "fear", "joy"]);
    }

    #[test]
    fn ties_keep_backend_order() {
        let classifier = EmotionClassifier::new(FixedBackend(vec![
            EmotionScore::new("anger", 0.4),
            EmotionScore::new("fear", 0.4),
            EmotionScore::new("joy", 0.2),
        ]));
        let result = classifier.analyze("hello");
        assert_eq!(result.distribution[0].label, "anger");
        assert_eq!(result.distribution[1].label, "fear");
    }

    #[test]
    fn negative_scores_are_rejected() {
        let classifier = EmotionClassifier::new(FixedBackend(vec![
            EmotionScore::new("joy", -0.1),
            EmotionScore::new("fear", 1.1),
        ]));
        let result = classifier.analyze("hello");
        assert_eq!(result.primary_emotion, "error");
        assert!(result.error.is_some());
    }

    #[test]
    fn backend_without_labels_is_neutral() {
        let classifier = EmotionClassifier::new(FixedBackend(Vec::new()));
        assert_eq!(classifier.analyze("hello"), EmotionResult::neutral());
    }

    #[test]
    fn long_text_is_truncated_on_char_boundary() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let classifier = EmotionClassifier::new(RecordingBackend(seen.clone())).with_max_chars(4);

        classifier.analyze("héllo wörld");
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], "héll");
    }

    #[test]
    fn explicit_scores_keep_neutral_primary() {
        let result = EmotionResult::from_explicit_scores(&EmotionScores {
            joy: 0.1,
            sadness: 0.6,
            anger: 0.2,
            fear: 0.1,
        });
        assert_eq!(result.primary_emotion, "neutral");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.score_for("sadness"), Some(0.6));
        assert_eq!(result.distribution[0].label, "sadness");
    }

    #[test]
    fn deserializes_wire_record() {
        let result: EmotionResult = serde_json::from_str(
            r#"{"emotion": "fear", "score": 0.81, "all_emotions": [{"emotion": "fear", "score": 0.81}]}"#,
        )
        .unwrap();
        assert_eq!(result.primary_emotion, "fear");
        assert_eq!(result.score_for("FEAR"), Some(0.81));
        assert!(result.is_usable());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        #[test]
        fn distribution_is_sorted_and_headed_by_primary(
            scores in prop::collection::vec(0.0f64..1.0, 1..8)
        ) {
            let labels = ["anger", "disgust", "fear", "joy", "neutral", "sadness", "surprise", "love"];
            let raw: Vec<EmotionScore> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| EmotionScore::new(labels[i], *s))
                .collect();
            let result = EmotionClassifier::new(FixedBackend(raw)).analyze("some text");

            prop_assert!(result.distribution.iter().all(|e| e.score >= 0.0));
            prop_assert!(result.distribution.windows(2).all(|w| w[0].score >= w[1].score));
            prop_assert_eq!(&result.primary_emotion, &result.distribution[0].label);
            prop_assert_eq!(result.confidence, result.distribution[0].score);
        }

        #[test]
        fn lexicon_distribution_is_sorted_for_any_text(text in ".{0,200}") {
            let result = EmotionClassifier::new(LexiconModel::default()).analyze(&text);

            prop_assert!(result.distribution.iter().all(|e| e.score >= 0.0));
            prop_assert!(result.distribution.windows(2).all(|w| w[0].score >= w[1].score));
            if let Some(head) = result.distribution.first() {
                prop_assert_eq!(&result.primary_emotion, &head.label);
            }
        }
    }
}
