use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::explain::{FactorKind, Severity};
use crate::models::{FactorSummary, StudentAssessment};
use crate::risk;

/// Count warning and critical factors per kind, most frequent first.
pub fn summarize_factors(assessments: &[StudentAssessment]) -> Vec<FactorSummary> {
    let mut map: BTreeMap<FactorKind, (usize, usize)> = BTreeMap::new();

    for entry in assessments {
        for factor in &entry.assessment.factors {
            let counts = map.entry(factor.kind).or_insert((0, 0));
            match factor.severity {
                Severity::Critical => counts.0 += 1,
                Severity::Warning => counts.1 += 1,
                Severity::Positive => {}
            }
        }
    }

    let mut summaries: Vec<FactorSummary> = map
        .into_iter()
        .map(|(kind, (critical, warning))| FactorSummary {
            kind,
            critical,
            warning,
        })
        .filter(|summary| summary.total() > 0)
        .collect();

    summaries.sort_by(|a, b| b.total().cmp(&a.total()));
    summaries
}

/// Render a markdown report. `assessments` must already be ranked.
pub fn build_report(
    scope: Option<&str>,
    since_days: i64,
    cutoff: NaiveDate,
    assessments: &[StudentAssessment],
) -> String {
    let counts = risk::category_counts(assessments);
    let summaries = summarize_factors(assessments);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all cohorts");

    let _ = writeln!(output, "# Student Risk Report");
    let _ = writeln!(
        output,
        "Generated for {} (signals from the last {} days, since {})",
        scope_label,
        since_days.max(1),
        cutoff
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");

    if assessments.is_empty() {
        let _ = writeln!(output, "No students assessed for this window.");
    } else {
        let _ = writeln!(output, "- high: {}", counts.high);
        let _ = writeln!(output, "- moderate: {}", counts.moderate);
        let _ = writeln!(output, "- low: {}", counts.low);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");

    if assessments.is_empty() {
        let _ = writeln!(output, "No students assessed for this window.");
    } else {
        for entry in assessments.iter().take(10) {
            let assessment = &entry.assessment;
            let _ = writeln!(
                output,
                "- {} ({}, {}) {} risk, score {:.2}",
                entry.full_name,
                entry.email,
                entry.cohort,
                assessment.category,
                assessment.risk_score
            );
            if assessment.error.is_some() {
                let _ = writeln!(output, "  - prediction unavailable, scored as moderate");
            }
            for factor in assessment.factors.iter().filter(|factor| factor.is_concern()) {
                let _ = writeln!(output, "  - {}", factor.message);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Common Risk Factors");

    if summaries.is_empty() {
        let _ = writeln!(output, "No warning or critical factors in this window.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} students ({} critical, {} warning)",
                summary.kind,
                summary.total(),
                summary.critical,
                summary.warning
            );
        }
    }

    output
}
