// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Length of the attempt window in minutes.
    pub duration_minutes: i64,
    pub total_marks: i64,
    pub passing_marks: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exam {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.duration_minutes)
    }
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_marks))]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: i64,
    #[validate(range(min = 0))]
    pub total_marks: i64,
    #[validate(range(min = 0))]
    pub passing_marks: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn validate_marks(req: &CreateExamRequest) -> Result<(), ValidationError> {
    if req.passing_marks > req.total_marks {
        return Err(ValidationError::new("passing_marks_exceed_total_marks"));
    }
    Ok(())
}

/// DTO for updating an exam. Fields are optional.
///
/// `duration_minutes`, `total_marks` and `passing_marks` shape how attempts are
/// timed and graded, so they are frozen once the exam has attempts.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 0))]
    pub total_marks: Option<i64>,
    #[validate(range(min = 0))]
    pub passing_marks: Option<i64>,
    pub is_active: Option<bool>,
}

impl UpdateExamRequest {
    pub fn touches_scoring(&self) -> bool {
        self.duration_minutes.is_some() || self.total_marks.is_some() || self.passing_marks.is_some()
    }
}

/// Exam listing row, with its question count.
#[derive(Debug, Serialize, FromRow)]
pub struct ExamSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub total_marks: i64,
    pub passing_marks: i64,
    pub question_count: i64,
}

/// Student-facing exam detail: exam metadata plus questions without the answer key.
#[derive(Debug, Serialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: Exam,
    pub questions: Vec<crate::models::question::PublicQuestion>,
}
