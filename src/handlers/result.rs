// src/handlers/result.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    attempt::scoring::percentage,
    catalog::{ExamCatalog, SqlExamCatalog},
    error::AppError,
    models::result::{
        CompletedAttemptRow, DetailedResult, ExamLeaderboardEntry, ExamLeaderboardRow,
        LeaderboardEntry, QuestionReview, ResultResponse, StudentAnalytics,
    },
    utils::jwt::Claims,
};

const LEADERBOARD_LIMIT: i64 = 50;
const RECENT_ATTEMPTS_LIMIT: i64 = 5;

/// Whole seconds between start and end of an attempt, never negative.
const TIME_SPENT_SQL: &str =
    "MAX(0, CAST(ROUND((julianday(a.end_time) - julianday(a.start_time)) * 86400) AS INTEGER))";

/// Percentage of the exam's marks earned by an attempt.
const PERCENTAGE_SQL: &str =
    "CASE WHEN e.total_marks > 0 THEN a.score * 100.0 / e.total_marks ELSE 0.0 END";

/// Completed attempts joined with their exam and student.
const COMPLETED_ATTEMPTS_SQL: &str = r#"
    SELECT
        a.id AS attempt_id, a.student_id, a.exam_id,
        e.title AS exam_title, u.username AS student_name,
        a.score, e.total_marks, e.passing_marks,
        a.correct_answers, a.total_questions,
        (SELECT COUNT(*) FROM answers s
            WHERE s.attempt_id = a.id AND s.selected_answer IS NOT NULL) AS answered,
        a.start_time, a.end_time
    FROM attempts a
    JOIN exams e ON e.id = a.exam_id
    JOIN users u ON u.id = a.student_id
    WHERE a.status = 'completed'
"#;

fn time_spent_seconds(row: &CompletedAttemptRow) -> Option<i64> {
    row.end_time
        .map(|end| (end - row.start_time).num_seconds().max(0))
}

fn to_result(row: CompletedAttemptRow) -> ResultResponse {
    let time_spent = time_spent_seconds(&row);
    ResultResponse {
        attempt_id: row.attempt_id,
        exam_id: row.exam_id,
        exam_title: row.exam_title,
        student_name: row.student_name,
        score: row.score,
        total_marks: row.total_marks,
        percentage: percentage(row.score, row.total_marks),
        correct_answers: row.correct_answers,
        wrong_answers: (row.answered - row.correct_answers).max(0),
        unanswered: (row.total_questions - row.answered).max(0),
        total_questions: row.total_questions,
        status: if row.score >= row.passing_marks { "Pass" } else { "Fail" }.to_string(),
        start_time: row.start_time,
        end_time: row.end_time,
        time_spent_seconds: time_spent,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

async fn ensure_exam_exists(pool: &SqlitePool, exam_id: i64) -> Result<(), AppError> {
    match SqlExamCatalog::new(pool.clone()).is_active(exam_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("Exam not found".to_string())),
    }
}

/// Loads a completed attempt visible to the caller.
/// In-progress and expired attempts have no result, and other students'
/// attempts are reported as missing.
async fn fetch_visible_result(
    pool: &SqlitePool,
    claims: &Claims,
    attempt_id: i64,
) -> Result<CompletedAttemptRow, AppError> {
    let row = sqlx::query_as::<_, CompletedAttemptRow>(&format!(
        "{} AND a.id = ?",
        COMPLETED_ATTEMPTS_SQL
    ))
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Result not found".to_string()))?;

    if !claims.is_admin() && row.student_id != claims.user_id()? {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    Ok(row)
}

/// Result card of one completed attempt.
/// Students only see their own attempts; admins see all.
pub async fn result_by_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = fetch_visible_result(&pool, &claims, attempt_id).await?;

    Ok(Json(to_result(row)))
}

/// Result card plus every question with the selected option, the correct
/// option and whether they match.
pub async fn detailed_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = fetch_visible_result(&pool, &claims, attempt_id).await?;

    let questions = sqlx::query_as::<_, QuestionReview>(
        r#"
        SELECT
            q.id AS question_id, q.question_text,
            q.option_a, q.option_b, q.option_c, q.option_d,
            q.marks, q.image_url,
            s.selected_answer, q.correct_answer,
            COALESCE(s.is_correct, 0) AS is_correct
        FROM questions q
        LEFT JOIN answers s ON s.question_id = q.id AND s.attempt_id = ?
        WHERE q.exam_id = ?
        ORDER BY q.id
        "#,
    )
    .bind(attempt_id)
    .bind(row.exam_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load answer review for attempt {}: {:?}", attempt_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(DetailedResult {
        result: to_result(row),
        questions,
    }))
}

/// Performance summary of the current user's completed attempts.
pub async fn student_analytics(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let total_exams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exams WHERE is_active = 1")
        .fetch_one(&pool)
        .await?;

    let (completed_exams, average, highest, total_time): (i64, f64, f64, i64) =
        sqlx::query_as(&format!(
            r#"
            SELECT
                COUNT(a.id),
                COALESCE(AVG({pct}), 0.0),
                COALESCE(MAX({pct}), 0.0),
                COALESCE(SUM({spent}), 0)
            FROM attempts a
            JOIN exams e ON e.id = a.exam_id
            WHERE a.status = 'completed' AND a.student_id = ?
            "#,
            pct = PERCENTAGE_SQL,
            spent = TIME_SPENT_SQL,
        ))
        .bind(student_id)
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to aggregate analytics for {}: {:?}", student_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    let recent = sqlx::query_as::<_, CompletedAttemptRow>(&format!(
        "{} AND a.student_id = ? ORDER BY a.end_time DESC, a.id DESC LIMIT ?",
        COMPLETED_ATTEMPTS_SQL
    ))
    .bind(student_id)
    .bind(RECENT_ATTEMPTS_LIMIT)
    .fetch_all(&pool)
    .await?;

    Ok(Json(StudentAnalytics {
        total_exams,
        completed_exams,
        average_percentage: round2(average),
        highest_percentage: round2(highest),
        total_time_spent_seconds: total_time,
        recent_attempts: recent.into_iter().map(to_result).collect(),
    }))
}

/// All completed attempts of an exam. Admin only.
pub async fn results_by_exam(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_exam_exists(&pool, exam_id).await?;

    let rows = sqlx::query_as::<_, CompletedAttemptRow>(&format!(
        "{} AND a.exam_id = ? ORDER BY a.id",
        COMPLETED_ATTEMPTS_SQL
    ))
    .bind(exam_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam results: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let results: Vec<ResultResponse> = rows.into_iter().map(to_result).collect();
    Ok(Json(results))
}

/// Students ranked by total points over their completed attempts.
pub async fn global_leaderboard(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let mut entries = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT
            u.username AS student_name,
            COALESCE(SUM(a.score), 0) AS total_points,
            COUNT(a.id) AS exams_completed,
            COALESCE(AVG(CASE WHEN e.total_marks > 0
                THEN a.score * 100.0 / e.total_marks ELSE 0.0 END), 0.0) AS average_score
        FROM attempts a
        JOIN users u ON u.id = a.student_id
        JOIN exams e ON e.id = a.exam_id
        WHERE a.status = 'completed'
        GROUP BY u.id, u.username
        ORDER BY total_points DESC, u.username ASC
        LIMIT ?
        "#,
    )
    .bind(LEADERBOARD_LIMIT)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.rank = idx as i64 + 1;
        entry.average_score = round2(entry.average_score);
    }

    Ok(Json(entries))
}

/// Completed attempts of one exam, best score first, faster first on ties.
pub async fn exam_leaderboard(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_exam_exists(&pool, exam_id).await?;

    let rows = sqlx::query_as::<_, ExamLeaderboardRow>(&format!(
        r#"
        SELECT
            u.username AS student_name, a.score, e.total_marks,
            {spent} AS time_spent_seconds
        FROM attempts a
        JOIN exams e ON e.id = a.exam_id
        JOIN users u ON u.id = a.student_id
        WHERE a.status = 'completed' AND a.exam_id = ?
        ORDER BY a.score DESC, time_spent_seconds ASC, a.id ASC
        LIMIT ?
        "#,
        spent = TIME_SPENT_SQL,
    ))
    .bind(exam_id)
    .bind(LEADERBOARD_LIMIT)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let leaderboard: Vec<ExamLeaderboardEntry> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| ExamLeaderboardEntry {
            rank: idx as i64 + 1,
            percentage: percentage(row.score, row.total_marks),
            student_name: row.student_name,
            score: row.score,
            time_spent_seconds: row.time_spent_seconds,
        })
        .collect();

    Ok(Json(leaderboard))
}
