// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    catalog::{EXAM_COLUMNS, QUESTION_COLUMNS},
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam, UpdateExamRequest},
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
    },
    utils::html::clean_html,
};

/// Whether any attempt references the exam. Such exams have their timing,
/// marks and questions frozen.
async fn exam_has_attempts(pool: &SqlitePool, exam_id: i64) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE exam_id = ?")
        .bind(exam_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

async fn ensure_exam_editable(pool: &SqlitePool, exam_id: i64) -> Result<(), AppError> {
    if exam_has_attempts(pool, exam_id).await? {
        return Err(AppError::Conflict(
            "Exam already has attempts; its questions and marks can no longer change".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_exam(pool: &SqlitePool, exam_id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {} FROM exams WHERE id = ?", EXAM_COLUMNS))
        .bind(exam_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

async fn fetch_question(pool: &SqlitePool, question_id: i64) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {} FROM questions WHERE id = ?",
        QUESTION_COLUMNS
    ))
    .bind(question_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))
}

/// Creates an exam.
/// Admin only.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let now = Utc::now();
    let exam = sqlx::query_as::<_, Exam>(&format!(
        r#"
        INSERT INTO exams
            (title, description, duration_minutes, total_marks, passing_marks, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        EXAM_COLUMNS
    ))
    .bind(clean_html(&payload.title))
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.duration_minutes)
    .bind(payload.total_marks)
    .bind(payload.passing_marks)
    .bind(payload.is_active)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("Exam {} created: {}", exam.id, exam.title);
    Ok((StatusCode::CREATED, Json(exam)))
}

/// Updates an exam. Fields are optional.
/// Admin only. Timing and marks are frozen once the exam has attempts.
pub async fn update_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let current = fetch_exam(&pool, id).await?;
    if payload.touches_scoring() {
        ensure_exam_editable(&pool, id).await?;
    }

    let total_marks = payload.total_marks.unwrap_or(current.total_marks);
    let passing_marks = payload.passing_marks.unwrap_or(current.passing_marks);
    if passing_marks > total_marks {
        return Err(AppError::BadRequest(
            "passing_marks cannot exceed total_marks".to_string(),
        ));
    }

    let exam = sqlx::query_as::<_, Exam>(&format!(
        r#"
        UPDATE exams SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            duration_minutes = COALESCE(?, duration_minutes),
            total_marks = ?,
            passing_marks = ?,
            is_active = COALESCE(?, is_active),
            updated_at = ?
        WHERE id = ?
        RETURNING {}
        "#,
        EXAM_COLUMNS
    ))
    .bind(payload.title.as_deref().map(clean_html))
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.duration_minutes)
    .bind(total_marks)
    .bind(passing_marks)
    .bind(payload.is_active)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(exam))
}

/// Soft-deletes an exam by deactivating it; attempts and results stay intact.
/// Admin only.
pub async fn deactivate_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("UPDATE exams SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    tracing::info!("Exam {} deactivated", id);
    Ok(Json(json!({ "message": "Exam deleted successfully" })))
}

/// Lists an exam's questions including the answer key.
/// Admin only.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_exam(&pool, exam_id).await?;

    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {} FROM questions WHERE exam_id = ? ORDER BY id",
        QUESTION_COLUMNS
    ))
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}

/// Adds a question to an exam.
/// Admin only. Rejected once the exam has attempts.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    fetch_exam(&pool, exam_id).await?;
    ensure_exam_editable(&pool, exam_id).await?;

    let correct_answer = payload.correct_answer.trim().to_ascii_uppercase();

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO questions
            (exam_id, question_text, option_a, option_b, option_c, option_d,
             correct_answer, marks, image_url, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        QUESTION_COLUMNS
    ))
    .bind(exam_id)
    .bind(clean_html(&payload.question_text))
    .bind(clean_html(&payload.option_a))
    .bind(clean_html(&payload.option_b))
    .bind(clean_html(&payload.option_c))
    .bind(clean_html(&payload.option_d))
    .bind(correct_answer)
    .bind(payload.marks)
    .bind(payload.image_url)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question. Fields are optional.
/// Admin only. Rejected once the owning exam has attempts.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let current = fetch_question(&pool, id).await?;
    ensure_exam_editable(&pool, current.exam_id).await?;

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        UPDATE questions SET
            question_text = COALESCE(?, question_text),
            option_a = COALESCE(?, option_a),
            option_b = COALESCE(?, option_b),
            option_c = COALESCE(?, option_c),
            option_d = COALESCE(?, option_d),
            correct_answer = COALESCE(?, correct_answer),
            marks = COALESCE(?, marks),
            image_url = COALESCE(?, image_url)
        WHERE id = ?
        RETURNING {}
        "#,
        QUESTION_COLUMNS
    ))
    .bind(payload.question_text.as_deref().map(clean_html))
    .bind(payload.option_a.as_deref().map(clean_html))
    .bind(payload.option_b.as_deref().map(clean_html))
    .bind(payload.option_c.as_deref().map(clean_html))
    .bind(payload.option_d.as_deref().map(clean_html))
    .bind(payload.correct_answer.map(|a| a.trim().to_ascii_uppercase()))
    .bind(payload.marks)
    .bind(payload.image_url)
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(question))
}

/// Deletes a question.
/// Admin only. Rejected once the owning exam has attempts.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let current = fetch_question(&pool, id).await?;
    ensure_exam_editable(&pool, current.exam_id).await?;

    sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
