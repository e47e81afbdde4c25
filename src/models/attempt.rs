// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::question::PublicQuestion;

/// Lifecycle state of an attempt.
///
/// `in_progress -> completed` on submit, `in_progress -> expired` when the
/// window lapses. Both `completed` and `expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Expired,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

/// Represents the 'attempts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<i64>,
    pub correct_answers: Option<i64>,
    pub total_questions: Option<i64>,
}

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_answer: Option<String>,
    pub is_correct: Option<bool>,
}

/// One answer as sent by the client.
/// `selected_answer` is `null` or `""` when the question is left unanswered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    #[serde(default)]
    pub selected_answer: Option<String>,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize)]
pub struct StartExamRequest {
    pub exam_id: i64,
}

/// Returned when an attempt starts. Questions never carry the answer key.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartExamResponse {
    pub attempt_id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub start_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for saving draft answers while the attempt is open.
#[derive(Debug, Deserialize)]
pub struct SaveAnswersRequest {
    pub answers: Vec<SubmittedAnswer>,
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    pub attempt_id: i64,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

/// Outcome of a submission.
///
/// `replayed` is true when the attempt had already been finalized and the
/// stored result is returned unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionResult {
    pub attempt_id: i64,
    pub score: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub total_marks: i64,
    pub percentage: f64,
    pub passed: bool,
    pub replayed: bool,
}

/// Row for the student's own attempt history.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AttemptSummary {
    pub id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<i64>,
    pub correct_answers: Option<i64>,
    pub total_questions: Option<i64>,
    pub total_marks: i64,
}

/// An attempt as seen by its owner, with the saved answers.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub expires_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
}
