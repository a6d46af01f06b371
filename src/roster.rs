use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{lenient, StudentRecord, StudentSignals};

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(default)]
    student_id: Option<Uuid>,
    full_name: String,
    email: String,
    #[serde(default)]
    cohort: String,
    #[serde(default, deserialize_with = "lenient::number")]
    cgpa: Option<f64>,
    #[serde(default, alias = "attendance_pct", deserialize_with = "lenient::number")]
    attendance_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    fee_pending: Option<bool>,
    #[serde(default, deserialize_with = "lenient::number")]
    mood_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    activities_per_week: Option<f64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    semester: Option<i64>,
    #[serde(default)]
    journal: Option<String>,
}

pub fn load_roster(path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open roster {}", path.display()))?;
    read_roster(file).with_context(|| format!("failed to read roster {}", path.display()))
}

/// Parse roster rows. Empty or malformed signal cells are treated as missing.
pub fn read_roster<R: Read>(reader: R) -> anyhow::Result<Vec<StudentRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut students = Vec::new();

    for (idx, result) in reader.deserialize::<RosterRow>().enumerate() {
        let line = idx + 2;
        let row = result.with_context(|| format!("invalid roster row on line {line}"))?;

        students.push(StudentRecord {
            student_id: row.student_id.unwrap_or_else(Uuid::new_v4),
            full_name: row.full_name,
            email: row.email,
            cohort: row.cohort,
            signals: StudentSignals {
                cgpa: row.cgpa,
                attendance_percentage: row.attendance_percentage,
                fee_pending: row.fee_pending,
                mood_score: row.mood_score,
                activities_per_week: row.activities_per_week,
                semester: row.semester,
            },
            journal: row.journal.filter(|text| !text.trim().is_empty()),
        });
    }

    tracing::debug!(students = students.len(), "roster loaded");
    Ok(students)
}
