//! Persistence for attempts and their answers.
//!
//! Status changes are compare-and-swap updates guarded by
//! `status = 'in_progress'`; the one-active-attempt rule is the partial unique
//! index `idx_attempts_one_active`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    attempt::AttemptError,
    db::is_unique_violation,
    models::attempt::{Answer, Attempt, AttemptSummary},
};

const ATTEMPT_COLUMNS: &str =
    "id, student_id, exam_id, status, start_time, end_time, score, correct_answers, total_questions";

/// A scored answer row written when an attempt is finalized.
#[derive(Debug, Clone)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_answer: Option<String>,
    pub is_correct: bool,
}

/// Everything persisted, atomically, when an attempt completes.
#[derive(Debug, Clone)]
pub struct Finalization {
    pub end_time: DateTime<Utc>,
    pub score: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub answers: Vec<GradedAnswer>,
}

#[derive(Debug, Clone)]
pub struct AttemptStore {
    pool: SqlitePool,
}

impl AttemptStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a new in-progress attempt.
    ///
    /// A concurrent start that already holds the in-progress slot for the
    /// same (student, exam) surfaces as `DuplicateAttempt`.
    pub async fn insert_in_progress(
        &self,
        student_id: i64,
        exam_id: i64,
        start_time: DateTime<Utc>,
    ) -> Result<Attempt, AttemptError> {
        sqlx::query_as::<_, Attempt>(&format!(
            "INSERT INTO attempts (student_id, exam_id, status, start_time) \
             VALUES (?, ?, 'in_progress', ?) RETURNING {}",
            ATTEMPT_COLUMNS
        ))
        .bind(student_id)
        .bind(exam_id)
        .bind(start_time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AttemptError::DuplicateAttempt;
            }
            tracing::error!("Failed to insert attempt: {:?}", e);
            AttemptError::from(e)
        })
    }

    pub async fn find(&self, attempt_id: i64) -> Result<Option<Attempt>, AttemptError> {
        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {} FROM attempts WHERE id = ?",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    pub async fn find_in_progress(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<Option<Attempt>, AttemptError> {
        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {} FROM attempts \
             WHERE student_id = ? AND exam_id = ? AND status = 'in_progress'",
            ATTEMPT_COLUMNS
        ))
        .bind(student_id)
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    /// `in_progress -> expired`. Returns false if the attempt was no longer in progress.
    pub async fn mark_expired(
        &self,
        attempt_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AttemptError> {
        let result = sqlx::query(
            "UPDATE attempts SET status = 'expired', end_time = ? \
             WHERE id = ? AND status = 'in_progress'",
        )
        .bind(now)
        .bind(attempt_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Upserts draft answers (`None` clears a saved selection).
    ///
    /// Returns false, writing nothing, if the attempt is no longer in progress.
    pub async fn save_drafts(
        &self,
        attempt_id: i64,
        answers: &HashMap<i64, Option<String>>,
    ) -> Result<bool, AttemptError> {
        let mut tx = self.pool.begin().await?;

        // Takes the write lock and re-checks the status inside the transaction.
        let guard = sqlx::query(
            "UPDATE attempts SET status = status WHERE id = ? AND status = 'in_progress'",
        )
        .bind(attempt_id)
        .execute(&mut *tx)
        .await?;

        if guard.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for (question_id, selected) in answers {
            sqlx::query(
                "INSERT INTO answers (attempt_id, question_id, selected_answer) VALUES (?, ?, ?) \
                 ON CONFLICT(attempt_id, question_id) DO UPDATE SET selected_answer = excluded.selected_answer",
            )
            .bind(attempt_id)
            .bind(question_id)
            .bind(selected.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Saved draft selections of an attempt (`question id -> letter`).
    pub async fn draft_answers(&self, attempt_id: i64) -> Result<HashMap<i64, String>, AttemptError> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT question_id, selected_answer FROM answers \
             WHERE attempt_id = ? AND selected_answer IS NOT NULL",
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    pub async fn answers(&self, attempt_id: i64) -> Result<Vec<Answer>, AttemptError> {
        let answers = sqlx::query_as::<_, Answer>(
            "SELECT attempt_id, question_id, selected_answer, is_correct \
             FROM answers WHERE attempt_id = ? ORDER BY question_id",
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    /// Completes an attempt: `in_progress -> completed` plus score fields and
    /// answer rows, in one transaction.
    ///
    /// Returns false, with nothing written, if another request already moved
    /// the attempt out of `in_progress`.
    pub async fn finalize(
        &self,
        attempt_id: i64,
        outcome: &Finalization,
    ) -> Result<bool, AttemptError> {
        let mut tx = self.pool.begin().await?;

        let swapped = sqlx::query(
            "UPDATE attempts \
             SET status = 'completed', end_time = ?, score = ?, correct_answers = ?, total_questions = ? \
             WHERE id = ? AND status = 'in_progress'",
        )
        .bind(outcome.end_time)
        .bind(outcome.score)
        .bind(outcome.correct_answers)
        .bind(outcome.total_questions)
        .bind(attempt_id)
        .execute(&mut *tx)
        .await?;

        if swapped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM answers WHERE attempt_id = ?")
            .bind(attempt_id)
            .execute(&mut *tx)
            .await?;

        if !outcome.answers.is_empty() {
            let mut query_builder = QueryBuilder::<Sqlite>::new(
                "INSERT INTO answers (attempt_id, question_id, selected_answer, is_correct) ",
            );
            query_builder.push_values(&outcome.answers, |mut row, answer| {
                row.push_bind(attempt_id)
                    .push_bind(answer.question_id)
                    .push_bind(answer.selected_answer.as_deref())
                    .push_bind(answer.is_correct);
            });
            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// A student's attempts, newest first.
    pub async fn list_for_student(&self, student_id: i64) -> Result<Vec<AttemptSummary>, AttemptError> {
        let attempts = sqlx::query_as::<_, AttemptSummary>(
            r#"
            SELECT
                a.id, a.exam_id, e.title AS exam_title, a.status, a.start_time, a.end_time,
                a.score, a.correct_answers, a.total_questions, e.total_marks
            FROM attempts a
            JOIN exams e ON e.id = a.exam_id
            WHERE a.student_id = ?
            ORDER BY a.id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }
}
