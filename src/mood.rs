use crate::emotion::EmotionResult;
use crate::models::round_to;

/// Score used for labels missing from the table, and the blend target for
/// low-confidence results.
pub const NEUTRAL_BASELINE: f64 = 5.0;

/// Below this confidence the base score is pulled toward the baseline.
pub const CONFIDENCE_FLOOR: f64 = 0.5;

const MOOD_TABLE: [(&str, f64); 11] = [
    ("joy", 9.0),
    ("happiness", 9.0),
    ("love", 8.5),
    ("surprise", 7.0),
    ("neutral", 6.5),
    ("fear", 3.5),
    ("sadness", 2.5),
    ("anger", 2.0),
    ("disgust", 2.0),
    ("anxiety", 3.0),
    ("disappointment", 3.5),
];

pub fn base_score(label: &str) -> f64 {
    MOOD_TABLE
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, score)| *score)
        .unwrap_or(NEUTRAL_BASELINE)
}

/// Mood on a 1-10 scale for an emotion result, rounded to 2 decimals.
pub fn mood_score(emotion: &EmotionResult) -> f64 {
    let base = base_score(&emotion.primary_emotion);
    let confidence = emotion.confidence.clamp(0.0, 1.0);

    let score = if confidence < CONFIDENCE_FLOOR {
        base * confidence + NEUTRAL_BASELINE * (1.0 - confidence)
    } else {
        base
    };

    round_to(score, 2)
}
