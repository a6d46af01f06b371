use serde::Serialize;

use crate::explain::{self, FactorKind, Severity};
use crate::models::{RiskAssessment, RiskCategory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WellnessTip {
    pub title: &'static str,
    pub text: &'static str,
}

const ACADEMIC_SUPPORT: WellnessTip = WellnessTip {
    title: "Academic Support",
    text: "Schedule tutoring sessions and meet with your professors during office hours.",
};

const IMPROVE_ATTENDANCE: WellnessTip = WellnessTip {
    title: "Improve Attendance",
    text: "Set daily reminders for classes and try to maintain at least 75% attendance.",
};

const FEE_PAYMENT: WellnessTip = WellnessTip {
    title: "Fee Payment",
    text: "Contact the accounts office to discuss payment plans or scholarship opportunities.",
};

const MENTAL_WELLNESS: WellnessTip = WellnessTip {
    title: "Mental Wellness",
    text: "Practice mindfulness, maintain a regular sleep schedule, and consider talking to a counselor.",
};

const KEEP_IT_UP: WellnessTip = WellnessTip {
    title: "Keep It Up!",
    text: "You're doing great! Maintain your routine and stay engaged with your studies.",
};

const STAY_ACTIVE: WellnessTip = WellnessTip {
    title: "Stay Active",
    text: "Regular physical activity can improve focus and reduce stress. Aim for 30 minutes daily.",
};

const QUALITY_SLEEP: WellnessTip = WellnessTip {
    title: "Quality Sleep",
    text: "Aim for 7-8 hours of sleep each night for better cognitive function and mood.",
};

/// Personalized tips for an assessment, most specific first.
pub fn wellness_tips(assessment: &RiskAssessment) -> Vec<WellnessTip> {
    let factors = &assessment.factors;
    let mut tips = Vec::new();

    if explain::has(factors, FactorKind::Academics, Severity::Critical) {
        tips.push(ACADEMIC_SUPPORT);
    }
    if explain::has(factors, FactorKind::Attendance, Severity::Warning) {
        tips.push(IMPROVE_ATTENDANCE);
    }
    if explain::has(factors, FactorKind::Fees, Severity::Warning) {
        tips.push(FEE_PAYMENT);
    }
    if explain::has(factors, FactorKind::Mood, Severity::Warning) {
        tips.push(MENTAL_WELLNESS);
    }
    if assessment.category == RiskCategory::Low {
        tips.push(KEEP_IT_UP);
    }

    tips.push(STAY_ACTIVE);
    tips.push(QUALITY_SLEEP);
    tips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract;
    use crate::models::{RiskProbabilities, StudentSignals};

    fn assessment(signals: StudentSignals, category: RiskCategory) -> RiskAssessment {
        let factors = explain::generate(&extract(&signals, None), None);
        RiskAssessment {
            risk_score: 0.5,
            category,
            probabilities: RiskProbabilities {
                low: 0.0,
                moderate: 1.0,
                high: 0.0,
            },
            explanation: explain::lines(&factors),
            factors,
            error: None,
        }
    }

    fn titles(tips: &[WellnessTip]) -> Vec<&'static str> {
        tips.iter().map(|tip| tip.title).collect()
    }

    #[test]
    fn struggling_student_gets_targeted_tips_in_order() {
        let signals = StudentSignals {
            cgpa: Some(5.0),
            attendance_percentage: Some(80.0),
            fee_pending: Some(true),
            mood_score: Some(5.0),
            ..StudentSignals::default()
        };
        let tips = wellness_tips(&assessment(signals, RiskCategory::High));
        assert_eq!(
            titles(&tips),
            [
                "Academic Support",
                "Improve Attendance",
                "Fee Payment",
                "Mental Wellness",
                "Stay Active",
                "Quality Sleep",
            ]
        );
    }

    #[test]
    fn low_risk_student_is_encouraged() {
        let signals = StudentSignals {
            cgpa: Some(9.0),
            attendance_percentage: Some(95.0),
            ..StudentSignals::default()
        };
        let tips = wellness_tips(&assessment(signals, RiskCategory::Low));
        assert_eq!(titles(&tips), ["Keep It Up!", "Stay Active", "Quality Sleep"]);
    }

    #[test]
    fn low_cgpa_above_critical_gets_no_academic_tip() {
        let signals = StudentSignals {
            cgpa: Some(6.5),
            ..StudentSignals::default()
        };
        let tips = wellness_tips(&assessment(signals, RiskCategory::Moderate));
        assert_eq!(titles(&tips), ["Stay Active", "Quality Sleep"]);
    }
}
