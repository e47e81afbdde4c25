// src/handlers/exam.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    catalog::{ExamCatalog, SqlExamCatalog},
    error::AppError,
    models::{
        exam::{ExamDetail, ExamSummary},
        question::PublicQuestion,
    },
};

/// Lists active exams with their question counts.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, ExamSummary>(
        r#"
        SELECT
            e.id, e.title, e.description, e.duration_minutes, e.total_marks, e.passing_marks,
            (SELECT COUNT(*) FROM questions q WHERE q.exam_id = e.id) AS question_count
        FROM exams e
        WHERE e.is_active = 1
        ORDER BY e.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exams: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(exams))
}

/// Returns an active exam with its questions, answer key stripped.
/// Inactive exams are hidden from students.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = SqlExamCatalog::new(pool);

    if catalog.is_active(id).await? != Some(true) {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    let found = catalog
        .get_exam(id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    Ok(Json(ExamDetail {
        questions: found.questions.iter().map(PublicQuestion::from).collect(),
        exam: found.exam,
    }))
}
