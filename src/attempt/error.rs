use std::fmt;

use axum::http::StatusCode;

/// Failures of the attempt lifecycle.
///
/// Everything except `Storage` is a client error. `Storage` means the
/// operation did not take effect and can be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// The student already has an in-progress attempt for this exam.
    DuplicateAttempt,
    ExamInactive,
    ExamNotFound,
    /// Unknown attempt, or one owned by another student.
    AttemptNotFound,
    /// The attempt is no longer in progress.
    AlreadyFinalized,
    /// The attempt's time window (plus grace) has elapsed.
    WindowExpired,
    InvalidAnswerPayload(String),
    Storage(String),
}

impl AttemptError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AttemptError::DuplicateAttempt => StatusCode::CONFLICT,
            AttemptError::ExamInactive => StatusCode::FORBIDDEN,
            AttemptError::ExamNotFound => StatusCode::NOT_FOUND,
            AttemptError::AttemptNotFound => StatusCode::NOT_FOUND,
            AttemptError::AlreadyFinalized => StatusCode::CONFLICT,
            AttemptError::WindowExpired => StatusCode::GONE,
            AttemptError::InvalidAnswerPayload(_) => StatusCode::BAD_REQUEST,
            AttemptError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AttemptError::DuplicateAttempt => "DUPLICATE_ATTEMPT",
            AttemptError::ExamInactive => "EXAM_INACTIVE",
            AttemptError::ExamNotFound => "EXAM_NOT_FOUND",
            AttemptError::AttemptNotFound => "ATTEMPT_NOT_FOUND",
            AttemptError::AlreadyFinalized => "ALREADY_FINALIZED",
            AttemptError::WindowExpired => "WINDOW_EXPIRED",
            AttemptError::InvalidAnswerPayload(_) => "INVALID_ANSWER_PAYLOAD",
            AttemptError::Storage(_) => "STORAGE_UNAVAILABLE",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Storage(_))
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::DuplicateAttempt => {
                write!(f, "An attempt for this exam is already in progress")
            }
            AttemptError::ExamInactive => write!(f, "Exam is not active"),
            AttemptError::ExamNotFound => write!(f, "Exam not found"),
            AttemptError::AttemptNotFound => write!(f, "Exam attempt not found"),
            AttemptError::AlreadyFinalized => write!(f, "Exam attempt is already finalized"),
            AttemptError::WindowExpired => write!(f, "The time window for this attempt has expired"),
            AttemptError::InvalidAnswerPayload(reason) => {
                write!(f, "Invalid answer payload: {}", reason)
            }
            AttemptError::Storage(msg) => write!(f, "Storage failure: {}", msg),
        }
    }
}

impl std::error::Error for AttemptError {}

impl From<sqlx::Error> for AttemptError {
    fn from(err: sqlx::Error) -> Self {
        AttemptError::Storage(err.to_string())
    }
}
