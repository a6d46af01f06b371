use chrono::{Duration, NaiveDate, Utc};

use crate::models::{round_to, CategoryCounts, RiskCategory, RiskProbabilities, StudentAssessment};

/// Lower edge of the high band, inclusive.
pub const HIGH_THRESHOLD: f64 = 0.6;
/// Lower edge of the moderate band, inclusive.
pub const MODERATE_THRESHOLD: f64 = 0.3;

/// Collapse class probabilities into a score in `[0, 1]` and its band.
///
/// `score = p_high + 0.5 * p_moderate`, rounded to 4 decimals. The band is
/// picked from the rounded score.
pub fn combine(probabilities: &RiskProbabilities) -> (f64, RiskCategory) {
    let score = round_to(probabilities.high + 0.5 * probabilities.moderate, 4);
    (score, categorize(score))
}

pub fn categorize(score: f64) -> RiskCategory {
    if score >= HIGH_THRESHOLD {
        RiskCategory::High
    } else if score >= MODERATE_THRESHOLD {
        RiskCategory::Moderate
    } else {
        RiskCategory::Low
    }
}

/// Order assessments by risk score, highest first. Ties keep input order.
pub fn rank_assessments(mut assessments: Vec<StudentAssessment>) -> Vec<StudentAssessment> {
    assessments.sort_by(|a, b| {
        b.assessment
            .risk_score
            .partial_cmp(&a.assessment.risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    assessments
}

pub fn category_counts(assessments: &[StudentAssessment]) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for entry in assessments {
        match entry.assessment.category {
            RiskCategory::Low => counts.low += 1,
            RiskCategory::Moderate => counts.moderate += 1,
            RiskCategory::High => counts.high += 1,
        }
    }
    counts
}

pub fn cutoff_date(since_days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(since_days.max(1))
}
