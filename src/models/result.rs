// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Result card for one finalized attempt.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultResponse {
    pub attempt_id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub student_name: String,
    pub score: i64,
    pub total_marks: i64,
    pub percentage: f64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub unanswered: i64,
    pub total_questions: i64,
    /// "Pass" or "Fail" against the exam's passing marks.
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub time_spent_seconds: Option<i64>,
}

/// Joined row feeding result cards and per-exam leaderboards.
#[derive(Debug, FromRow)]
pub struct CompletedAttemptRow {
    pub attempt_id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub student_name: String,
    pub score: i64,
    pub total_marks: i64,
    pub passing_marks: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub answered: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Aggregated struct for displaying the global leaderboard.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct LeaderboardEntry {
    #[sqlx(default)]
    pub rank: i64,
    pub student_name: String,
    pub total_points: i64,
    pub exams_completed: i64,
    pub average_score: f64,
}

/// One completed attempt on a single exam's leaderboard.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExamLeaderboardEntry {
    pub rank: i64,
    pub student_name: String,
    pub score: i64,
    pub percentage: f64,
    pub time_spent_seconds: i64,
}

/// Leaderboard row as ranked by the database.
#[derive(Debug, FromRow)]
pub struct ExamLeaderboardRow {
    pub student_name: String,
    pub score: i64,
    pub total_marks: i64,
    pub time_spent_seconds: i64,
}

/// A question of a completed attempt, with the student's choice and the key.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct QuestionReview {
    pub question_id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub marks: i64,
    pub image_url: Option<String>,
    /// None when the question was left unanswered.
    pub selected_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Result card plus the per-question review.
#[derive(Debug, Serialize, Deserialize)]
pub struct DetailedResult {
    #[serde(flatten)]
    pub result: ResultResponse,
    pub questions: Vec<QuestionReview>,
}

/// Personal performance summary over a student's completed attempts.
#[derive(Debug, Serialize, Deserialize)]
pub struct StudentAnalytics {
    /// Active exams currently offered.
    pub total_exams: i64,
    pub completed_exams: i64,
    pub average_percentage: f64,
    pub highest_percentage: f64,
    pub total_time_spent_seconds: i64,
    /// Latest completed attempts, newest first.
    pub recent_attempts: Vec<ResultResponse>,
}
