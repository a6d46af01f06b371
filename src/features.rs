use serde::{Deserialize, Serialize};

use crate::emotion::EmotionResult;
use crate::models::StudentSignals;

pub const FEATURE_COUNT: usize = 10;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "cgpa",
    "attendance_percentage",
    "fee_pending",
    "mood_score",
    "activities_per_week",
    "emotion_joy",
    "emotion_sadness",
    "emotion_anger",
    "emotion_fear",
    "semester",
];

/// Emotion labels that populate sub-features, in feature order.
///
/// Matching is exact (case-insensitive). Anything else, including synonyms
/// such as "happiness", contributes nothing.
pub const EMOTION_FEATURE_LABELS: [&str; 4] = ["joy", "sadness", "anger", "fear"];

pub const CGPA: usize = 0;
pub const ATTENDANCE: usize = 1;
pub const FEE_PENDING: usize = 2;
pub const MOOD: usize = 3;
pub const ACTIVITIES: usize = 4;
pub const EMOTION_JOY: usize = 5;
pub const SEMESTER: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn cgpa(&self) -> f64 {
        self.0[CGPA]
    }

    pub fn attendance(&self) -> f64 {
        self.0[ATTENDANCE]
    }

    pub fn fee_pending(&self) -> f64 {
        self.0[FEE_PENDING]
    }

    pub fn mood(&self) -> f64 {
        self.0[MOOD]
    }

    pub fn activities(&self) -> f64 {
        self.0[ACTIVITIES]
    }

    pub fn semester(&self) -> f64 {
        self.0[SEMESTER]
    }

    /// Emotion sub-score for one of [`EMOTION_FEATURE_LABELS`].
    pub fn emotion(&self, label: &str) -> Option<f64> {
        EMOTION_FEATURE_LABELS
            .iter()
            .position(|known| *known == label)
            .map(|offset| self.0[EMOTION_JOY + offset])
    }

    /// Index of the first non-finite feature, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.0.iter().position(|value| !value.is_finite())
    }
}

/// Encode signals and an optional emotion result as a [`FeatureVector`].
pub fn extract(signals: &StudentSignals, emotion: Option<&EmotionResult>) -> FeatureVector {
    let resolved = signals.resolve();

    let mut emotions = [0.0; 4];
    if let Some(result) = emotion {
        for (slot, label) in emotions.iter_mut().zip(EMOTION_FEATURE_LABELS) {
            if let Some(score) = result.score_for(label) {
                *slot = score;
            }
        }
    }

    FeatureVector([
        resolved.cgpa,
        resolved.attendance_percentage,
        if resolved.fee_pending { 1.0 } else { 0.0 },
        resolved.mood_score,
        resolved.activities_per_week,
        emotions[0],
        emotions[1],
        emotions[2],
        emotions[3],
        resolved.semester as f64,
    ])
}
