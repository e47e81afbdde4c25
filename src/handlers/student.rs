// src/handlers/student.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    attempt::AttemptLifecycle,
    error::AppError,
    models::attempt::{SaveAnswersRequest, StartExamRequest, SubmitExamRequest},
    utils::jwt::Claims,
};

/// Starts a timed attempt on an exam.
///
/// Returns 201 with the attempt id, its deadline and the questions without
/// the answer key. Admin accounts cannot sit exams.
pub async fn start_exam(
    State(lifecycle): State<AttemptLifecycle>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.is_admin() {
        tracing::warn!("Admin {} tried to start exam {}", claims.sub, req.exam_id);
        return Err(AppError::Forbidden(
            "Only students can take exams".to_string(),
        ));
    }
    let student_id = claims.user_id()?;
    let started = lifecycle.start_attempt(student_id, req.exam_id).await?;

    Ok((StatusCode::CREATED, Json(started)))
}

/// Saves draft answers on an open attempt.
pub async fn save_answers(
    State(lifecycle): State<AttemptLifecycle>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(req): Json<SaveAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let saved = lifecycle
        .record_answers(student_id, attempt_id, &req.answers)
        .await?;

    Ok(Json(json!({ "attempt_id": attempt_id, "saved": saved })))
}

/// Submits an attempt for scoring.
///
/// Retrying a submission that already went through returns the stored
/// result with `replayed: true`.
pub async fn submit_exam(
    State(lifecycle): State<AttemptLifecycle>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let result = lifecycle
        .submit_attempt(student_id, req.attempt_id, &req.answers)
        .await?;

    Ok(Json(result))
}

/// Lists the current student's attempts, newest first.
pub async fn my_attempts(
    State(lifecycle): State<AttemptLifecycle>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let attempts = lifecycle.list_attempts(student_id).await?;

    Ok(Json(attempts))
}

/// Returns one of the current student's attempts with its saved answers.
pub async fn get_attempt(
    State(lifecycle): State<AttemptLifecycle>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let detail = lifecycle.get_attempt(student_id, attempt_id).await?;

    Ok(Json(detail))
}
