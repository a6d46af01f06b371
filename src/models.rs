use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CGPA: f64 = 7.0;
pub const DEFAULT_ATTENDANCE: f64 = 85.0;
pub const DEFAULT_MOOD: f64 = 6.5;
pub const DEFAULT_ACTIVITIES: f64 = 3.0;
pub const DEFAULT_SEMESTER: i64 = 4;

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Academic and behavioral signals for one student, as received at the boundary.
///
/// A wrong-typed field deserializes to `None` rather than failing the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentSignals {
    #[serde(default, deserialize_with = "lenient::number")]
    pub cgpa: Option<f64>,
    #[serde(default, alias = "attendance_pct", deserialize_with = "lenient::number")]
    pub attendance_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub fee_pending: Option<bool>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub mood_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub activities_per_week: Option<f64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub semester: Option<i64>,
}

/// Field deserializers that turn malformed signals into missing ones.
///
/// Input is read as a JSON value first, so the same helpers serve JSON
/// requests and CSV cells.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| {
            let parsed = match &value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            parsed.or_else(|| discard(&value))
        }))
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| {
            let parsed = match &value {
                Value::Bool(b) => Some(*b),
                Value::Number(n) => n.as_f64().map(|n| n != 0.0),
                Value::String(s) => parse_flag(s),
                _ => None,
            };
            parsed.or_else(|| discard(&value))
        }))
    }

    pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| {
            let parsed = match &value {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
                Value::String(s) => s.trim().parse::<f64>().ok().and_then(integral),
                _ => None,
            };
            parsed.or_else(|| discard(&value))
        }))
    }

    pub fn parse_flag(raw: &str) -> Option<bool> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        }
    }

    fn integral(value: f64) -> Option<i64> {
        (value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64)
            .then_some(value as i64)
    }

    fn discard<T>(value: &Value) -> Option<T> {
        tracing::debug!(value = %value, "malformed signal replaced with default");
        None
    }
}

/// Signals with every field resolved to a usable value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSignals {
    pub cgpa: f64,
    pub attendance_percentage: f64,
    pub fee_pending: bool,
    pub mood_score: f64,
    pub activities_per_week: f64,
    pub semester: i64,
}

impl StudentSignals {
    /// Resolve missing, non-finite and out-of-range fields.
    ///
    /// Missing or non-finite values take their defaults; out-of-range values
    /// are clamped. Neither is an error.
    pub fn resolve(&self) -> ResolvedSignals {
        ResolvedSignals {
            cgpa: resolve_field("cgpa", self.cgpa, DEFAULT_CGPA, 0.0, 10.0),
            attendance_percentage: resolve_field(
                "attendance_percentage",
                self.attendance_percentage,
                DEFAULT_ATTENDANCE,
                0.0,
                100.0,
            ),
            fee_pending: self.fee_pending.unwrap_or(false),
            mood_score: resolve_field("mood_score", self.mood_score, DEFAULT_MOOD, 1.0, 10.0),
            activities_per_week: resolve_field(
                "activities_per_week",
                self.activities_per_week,
                DEFAULT_ACTIVITIES,
                0.0,
                f64::INFINITY,
            ),
            semester: self.semester.unwrap_or(DEFAULT_SEMESTER).clamp(1, 8),
        }
    }
}

fn resolve_field(name: &str, value: Option<f64>, default: f64, min: f64, max: f64) -> f64 {
    match value {
        None => default,
        Some(v) if !v.is_finite() => {
            tracing::debug!(field = name, "non-finite signal replaced with default");
            default
        }
        Some(v) if v < min || v > max => {
            tracing::debug!(field = name, value = v, "out-of-range signal clamped");
            v.clamp(min, max)
        }
        Some(v) => v,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 3] = [RiskCategory::Low, RiskCategory::Moderate, RiskCategory::High];

    /// Class index used by the risk model.
    pub fn index(self) -> usize {
        match self {
            RiskCategory::Low => 0,
            RiskCategory::Moderate => 1,
            RiskCategory::High => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskCategory::Low => "low",
            RiskCategory::Moderate => "moderate",
            RiskCategory::High => "high",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class probabilities from the risk model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskProbabilities {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

impl RiskProbabilities {
    /// Build from model output, renormalizing so the three sum to 1.
    pub fn from_model_output(proba: [f64; 3]) -> Self {
        let total: f64 = proba.iter().sum();
        let [low, moderate, high] = if total > 0.0 {
            proba.map(|p| p / total)
        } else {
            [1.0 / 3.0; 3]
        };
        Self { low, moderate, high }
    }

    pub fn rounded(&self, places: i32) -> Self {
        Self {
            low: round_to(self.low, places),
            moderate: round_to(self.moderate, places),
            high: round_to(self.high, places),
        }
    }

    pub fn sum(&self) -> f64 {
        self.low + self.moderate + self.high
    }
}

/// Outcome of a risk assessment.
///
/// Serializes to `{risk_score, risk_category, risk_probabilities, explanation, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    #[serde(rename = "risk_category")]
    pub category: RiskCategory,
    #[serde(rename = "risk_probabilities")]
    pub probabilities: RiskProbabilities,
    pub explanation: Vec<String>,
    #[serde(skip)]
    pub factors: Vec<crate::explain::Factor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A student as known to the roster collaborator.
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub student_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub cohort: String,
    pub signals: StudentSignals,
    /// Most recent journal text, if any.
    pub journal: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentAssessment {
    pub student_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub cohort: String,
    pub assessment: RiskAssessment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorSummary {
    pub kind: crate::explain::FactorKind,
    pub critical: usize,
    pub warning: usize,
}

impl FactorSummary {
    pub fn total(&self) -> usize {
        self.critical + self.warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let resolved = StudentSignals::default().resolve();
        assert_eq!(resolved.cgpa, 7.0);
        assert_eq!(resolved.attendance_percentage, 85.0);
        assert!(!resolved.fee_pending);
        assert_eq!(resolved.mood_score, 6.5);
        assert_eq!(resolved.activities_per_week, 3.0);
        assert_eq!(resolved.semester, 4);
    }

    #[test]
    fn malformed_fields_are_repaired() {
        let signals = StudentSignals {
            cgpa: Some(f64::NAN),
            attendance_percentage: Some(140.0),
            activities_per_week: Some(-2.0),
            semester: Some(12),
            ..StudentSignals::default()
        };
        let resolved = signals.resolve();
        assert_eq!(resolved.cgpa, 7.0);
        assert_eq!(resolved.attendance_percentage, 100.0);
        assert_eq!(resolved.activities_per_week, 0.0);
        assert_eq!(resolved.semester, 8);
    }

    #[test]
    fn accepts_attendance_alias() {
        let signals: StudentSignals =
            serde_json::from_str(r#"{"attendance_pct": 72.5, "fee_pending": true}"#).unwrap();
        assert_eq!(signals.attendance_percentage, Some(72.5));
        assert_eq!(signals.fee_pending, Some(true));
        assert_eq!(signals.cgpa, None);
    }

    #[test]
    fn wrong_typed_fields_become_missing() {
        let signals: StudentSignals = serde_json::from_value(serde_json::json!({
            "cgpa": "abc",
            "fee_pending": 1,
            "semester": 3.0,
            "mood_score": "4.5",
            "activities_per_week": [2],
            "attendance_percentage": null
        }))
        .unwrap();

        assert_eq!(signals.cgpa, None);
        assert_eq!(signals.fee_pending, Some(true));
        assert_eq!(signals.semester, Some(3));
        assert_eq!(signals.mood_score, Some(4.5));
        assert_eq!(signals.activities_per_week, None);
        assert_eq!(signals.attendance_percentage, None);

        let resolved = signals.resolve();
        assert_eq!(resolved.cgpa, 7.0);
        assert_eq!(resolved.activities_per_week, 3.0);
    }

    #[test]
    fn fractional_semester_and_unknown_flag_are_dropped() {
        let signals: StudentSignals =
            serde_json::from_value(serde_json::json!({"semester": 2.5, "fee_pending": "maybe"}))
                .unwrap();
        assert_eq!(signals.semester, None);
        assert_eq!(signals.fee_pending, None);
        assert_eq!(signals.resolve().semester, 4);
        assert!(!signals.resolve().fee_pending);
    }

    #[test]
    fn probabilities_are_renormalized() {
        let probs = RiskProbabilities::from_model_output([2.0, 1.0, 1.0]);
        assert!((probs.sum() - 1.0).abs() < 1e-12);
        assert_eq!(probs.low, 0.5);

        let uniform = RiskProbabilities::from_model_output([0.0, 0.0, 0.0]);
        assert!((uniform.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_to(1.25, 1), 1.3);
        assert_eq!(round_to(-1.25, 1), -1.3);
        assert_eq!(round_to(0.600_000_000_000_000_1, 4), 0.6);
    }

    #[test]
    fn category_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskCategory::Moderate).unwrap(), "\"moderate\"");
    }
}
