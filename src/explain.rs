use serde::{Deserialize, Serialize};

use crate::emotion::EmotionResult;
use crate::features::FeatureVector;

pub const NO_FACTORS: &str = "no significant risk factors detected.";

/// Primary emotions at or below this confidence are not reported.
const EMOTION_CONFIDENCE: f64 = 0.5;
const NEGATIVE_EMOTIONS: [&str; 3] = ["sadness", "anger", "fear"];
const POSITIVE_EMOTIONS: [&str; 2] = ["joy", "happiness"];

/// Explained fields, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Academics,
    Attendance,
    Fees,
    Mood,
    Engagement,
    EmotionalState,
}

impl FactorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FactorKind::Academics => "academics",
            FactorKind::Attendance => "attendance",
            FactorKind::Fees => "fees",
            FactorKind::Mood => "mood",
            FactorKind::Engagement => "engagement",
            FactorKind::EmotionalState => "emotional state",
        }
    }
}

impl std::fmt::Display for FactorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Positive,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub kind: FactorKind,
    pub severity: Severity,
    pub message: String,
}

impl Factor {
    fn new(kind: FactorKind, severity: Severity, message: String) -> Self {
        Self {
            kind,
            severity,
            message,
        }
    }

    pub fn is_concern(&self) -> bool {
        self.severity >= Severity::Warning
    }
}

pub fn generate(features: &FeatureVector, emotion: Option<&EmotionResult>) -> Vec<Factor> {
    let mut factors = Vec::new();

    let cgpa = features.cgpa();
    if cgpa < 6.0 {
        factors.push(Factor::new(
            FactorKind::Academics,
            Severity::Critical,
            format!("critical CGPA: {cgpa:.2}, below minimum requirement"),
        ));
    } else if cgpa < 7.0 {
        factors.push(Factor::new(
            FactorKind::Academics,
            Severity::Warning,
            format!("low CGPA: {cgpa:.2}, needs improvement"),
        ));
    } else if cgpa >= 8.5 {
        factors.push(Factor::new(
            FactorKind::Academics,
            Severity::Positive,
            format!("excellent CGPA: {cgpa:.2}"),
        ));
    }

    let attendance = features.attendance();
    if attendance < 75.0 {
        factors.push(Factor::new(
            FactorKind::Attendance,
            Severity::Critical,
            format!("low attendance: {attendance:.1}%, below required 75%"),
        ));
    } else if attendance < 85.0 {
        factors.push(Factor::new(
            FactorKind::Attendance,
            Severity::Warning,
            format!("attendance needs improvement: {attendance:.1}%"),
        ));
    } else {
        factors.push(Factor::new(
            FactorKind::Attendance,
            Severity::Positive,
            format!("good attendance: {attendance:.1}%"),
        ));
    }

    if features.fee_pending() > 0.5 {
        factors.push(Factor::new(
            FactorKind::Fees,
            Severity::Warning,
            "fee payment pending, may affect enrollment".to_string(),
        ));
    }

    let mood = features.mood();
    if mood < 4.0 {
        factors.push(Factor::new(
            FactorKind::Mood,
            Severity::Critical,
            format!("low mood score: {mood:.1}/10, mental health support recommended"),
        ));
    } else if mood < 6.0 {
        factors.push(Factor::new(
            FactorKind::Mood,
            Severity::Warning,
            format!("below average mood: {mood:.1}/10"),
        ));
    } else if mood >= 8.0 {
        factors.push(Factor::new(
            FactorKind::Mood,
            Severity::Positive,
            format!("positive mood: {mood:.1}/10"),
        ));
    }

    let activities = features.activities();
    if activities < 2.0 {
        factors.push(Factor::new(
            FactorKind::Engagement,
            Severity::Warning,
            format!("low engagement: {activities:.1} activities/week"),
        ));
    } else if activities >= 4.0 {
        factors.push(Factor::new(
            FactorKind::Engagement,
            Severity::Positive,
            format!("good engagement: {activities:.1} activities/week"),
        ));
    }

    if let Some(factor) = emotion.and_then(emotional_state) {
        factors.push(factor);
    }

    factors
}

fn emotional_state(result: &EmotionResult) -> Option<Factor> {
    if result.confidence <= EMOTION_CONFIDENCE {
        return None;
    }
    let label = result.primary_emotion.as_str();
    if NEGATIVE_EMOTIONS.contains(&label) {
        Some(Factor::new(
            FactorKind::EmotionalState,
            Severity::Warning,
            format!("detected {label} in recent entries, may need support"),
        ))
    } else if POSITIVE_EMOTIONS.contains(&label) {
        Some(Factor::new(
            FactorKind::EmotionalState,
            Severity::Positive,
            "positive emotional state detected".to_string(),
        ))
    } else {
        None
    }
}

/// Render factors as explanation lines, falling back to [`NO_FACTORS`].
pub fn lines(factors: &[Factor]) -> Vec<String> {
    if factors.is_empty() {
        return vec![NO_FACTORS.to_string()];
    }
    factors.iter().map(|factor| factor.message.clone()).collect()
}

pub fn has(factors: &[Factor], kind: FactorKind, min_severity: Severity) -> bool {
    factors
        .iter()
        .any(|factor| factor.kind == kind && factor.severity >= min_severity)
}
