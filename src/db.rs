use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use crate::models::{StudentRecord, StudentSignals};

const STUDENTS_QUERY: &str = "SELECT s.id AS student_id, s.full_name, s.email, s.cohort, \
     s.cgpa::float8 AS cgpa, s.fee_pending, s.semester::int8 AS semester, \
     (SELECT AVG(a.attendance_percentage)::float8 FROM student_wellness.attendance a \
      WHERE a.student_id = s.id) AS avg_attendance, \
     (SELECT AVG(m.mood_score)::float8 FROM student_wellness.moods m \
      WHERE m.student_id = s.id AND m.created_at >= $1::date) AS avg_mood, \
     (SELECT j.content FROM student_wellness.journals j \
      WHERE j.student_id = s.id AND j.created_at >= $1::date \
      ORDER BY j.created_at DESC LIMIT 1) AS latest_journal \
     FROM student_wellness.students s \
     WHERE TRUE";

fn build_query(cohort: Option<&str>, email: Option<&str>) -> String {
    let mut query = String::from(STUDENTS_QUERY);
    if cohort.is_some() {
        query.push_str(" AND s.cohort = $2");
    } else if email.is_some() {
        query.push_str(" AND s.email = $2");
    }
    query.push_str(" ORDER BY s.full_name");
    query
}

/// Fetch students with signals aggregated over the window starting at `since_date`.
///
/// Attendance is averaged over all records, mood over the window, and the
/// journal is the latest entry in the window. Aggregates with no rows come
/// back as missing signals.
pub async fn fetch_student_records(
    pool: &PgPool,
    since_date: NaiveDate,
    cohort: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<Vec<StudentRecord>> {
    let query = build_query(cohort, email);
    let mut rows = sqlx::query(&query).bind(since_date);

    if let Some(value) = cohort {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut students = Vec::with_capacity(records.len());

    for row in records {
        students.push(StudentRecord {
            student_id: row.try_get("student_id")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            cohort: row.try_get("cohort")?,
            signals: StudentSignals {
                cgpa: row.try_get("cgpa")?,
                attendance_percentage: row.try_get("avg_attendance")?,
                fee_pending: row.try_get("fee_pending")?,
                mood_score: row.try_get("avg_mood")?,
                activities_per_week: None,
                semester: row.try_get("semester")?,
            },
            journal: row.try_get("latest_journal")?,
        });
    }

    tracing::debug!(students = students.len(), %since_date, "student records fetched");
    Ok(students)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscoped_query_has_one_parameter() {
        let query = build_query(None, None);
        assert!(query.contains("$1"));
        assert!(!query.contains("$2"));
        assert!(query.ends_with("ORDER BY s.full_name"));
    }

    #[test]
    fn cohort_takes_precedence_over_email() {
        let query = build_query(Some("2026"), Some("avery@example.com"));
        assert!(query.contains("s.cohort = $2"));
        assert!(!query.contains("s.email = $2"));

        let query = build_query(None, Some("avery@example.com"));
        assert!(query.contains("s.email = $2"));
    }
}
