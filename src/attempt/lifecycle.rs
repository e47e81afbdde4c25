//! Attempt lifecycle controller: start, save answers, submit, read back.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::{
    attempt::{
        AttemptError, AttemptStore, SessionValidator,
        scoring::{grade, percentage, score},
        session::validate_answers,
        store::{Finalization, GradedAnswer},
    },
    catalog::{ExamCatalog, ExamWithQuestions},
    models::{
        attempt::{
            Attempt, AttemptDetail, AttemptStatus, AttemptSummary, StartExamResponse,
            SubmissionResult, SubmittedAnswer,
        },
        exam::Exam,
        question::PublicQuestion,
    },
};

#[derive(Clone)]
pub struct AttemptLifecycle {
    store: AttemptStore,
    catalog: Arc<dyn ExamCatalog>,
    validator: SessionValidator,
}

impl AttemptLifecycle {
    pub fn new(pool: SqlitePool, catalog: Arc<dyn ExamCatalog>, grace: Duration) -> Self {
        Self {
            store: AttemptStore::new(pool),
            catalog,
            validator: SessionValidator::new(grace),
        }
    }

    /// Starts a new attempt for `student_id` on `exam_id`.
    ///
    /// An in-progress attempt whose window has already lapsed is expired
    /// first, so it does not block the student.
    pub async fn start_attempt(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<StartExamResponse, AttemptError> {
        let ExamWithQuestions { exam, questions } = self.load_exam(exam_id).await?;
        let now = Utc::now();

        let in_progress = match self.store.find_in_progress(student_id, exam_id).await? {
            Some(stale) if self.validator.is_overdue(&stale, &exam, now) => {
                self.expire(&stale, now).await?;
                None
            }
            other => other,
        };

        if let Err(reason) = self.validator.can_start(&exam, in_progress.as_ref()) {
            tracing::warn!(
                "Start rejected for student {} on exam {}: {}",
                student_id,
                exam_id,
                reason
            );
            return Err(reason);
        }

        let attempt = self.store.insert_in_progress(student_id, exam_id, now).await?;
        tracing::info!(
            "Attempt {} started by student {} on exam {}",
            attempt.id,
            student_id,
            exam_id
        );

        Ok(StartExamResponse {
            attempt_id: attempt.id,
            exam_id: exam.id,
            exam_title: exam.title.clone(),
            start_time: attempt.start_time,
            expires_at: SessionValidator::deadline(attempt.start_time, &exam),
            duration_minutes: exam.duration_minutes,
            questions: questions.iter().map(PublicQuestion::from).collect(),
        })
    }

    /// Saves draft answers on an open attempt. Drafts are never scored on
    /// their own; they are merged into the final submission.
    ///
    /// Returns how many answers were written.
    pub async fn record_answers(
        &self,
        student_id: i64,
        attempt_id: i64,
        answers: &[SubmittedAnswer],
    ) -> Result<usize, AttemptError> {
        let attempt = self.owned_attempt(student_id, attempt_id).await?;
        let ExamWithQuestions { exam, questions } = self.load_exam(attempt.exam_id).await?;
        let now = Utc::now();

        self.check_open(&attempt, &exam, now).await?;

        let validated = validate_answers(&questions, answers)?;
        if !self.store.save_drafts(attempt.id, &validated).await? {
            return Err(AttemptError::AlreadyFinalized);
        }

        tracing::debug!("Saved {} draft answers on attempt {}", validated.len(), attempt.id);
        Ok(validated.len())
    }

    /// Submits an attempt and scores it.
    ///
    /// Submitting an already completed attempt returns the stored result
    /// without scoring again. A late submission expires the attempt and is
    /// rejected with `WindowExpired`; its answers are discarded.
    pub async fn submit_attempt(
        &self,
        student_id: i64,
        attempt_id: i64,
        answers: &[SubmittedAnswer],
    ) -> Result<SubmissionResult, AttemptError> {
        let attempt = self.owned_attempt(student_id, attempt_id).await?;
        let ExamWithQuestions { exam, questions } = self.load_exam(attempt.exam_id).await?;
        let now = Utc::now();

        if attempt.status.is_terminal() {
            return stored_result(&attempt, &exam);
        }
        self.check_open(&attempt, &exam, now).await?;

        let submitted = validate_answers(&questions, answers)?;

        // Submitted answers win over saved drafts; an explicit blank clears a draft.
        let mut merged = self.store.draft_answers(attempt.id).await?;
        for (question_id, selected) in submitted {
            match selected {
                Some(letter) => merged.insert(question_id, letter),
                None => merged.remove(&question_id),
            };
        }

        let result = score(&questions, &merged);
        let graded = questions
            .iter()
            .map(|q| {
                let selected = merged.get(&q.id).cloned();
                GradedAnswer {
                    question_id: q.id,
                    is_correct: grade(q, selected.as_deref()),
                    selected_answer: selected,
                }
            })
            .collect();

        let outcome = Finalization {
            end_time: now,
            score: result.total_score,
            correct_answers: result.correct_count,
            total_questions: questions.len() as i64,
            answers: graded,
        };

        if self.store.finalize(attempt.id, &outcome).await? {
            tracing::info!(
                "Attempt {} completed: {}/{} correct, score {}",
                attempt.id,
                outcome.correct_answers,
                outcome.total_questions,
                outcome.score
            );
            return Ok(build_result(
                attempt.id,
                &exam,
                outcome.score,
                outcome.correct_answers,
                outcome.total_questions,
                false,
            ));
        }

        // A concurrent request finalized the attempt first; report what it stored.
        tracing::warn!("Attempt {} was finalized concurrently", attempt.id);
        let current = self
            .store
            .find(attempt.id)
            .await?
            .ok_or(AttemptError::AttemptNotFound)?;
        stored_result(&current, &exam)
    }

    /// The student's attempts, newest first.
    pub async fn list_attempts(&self, student_id: i64) -> Result<Vec<AttemptSummary>, AttemptError> {
        self.store.list_for_student(student_id).await
    }

    /// One of the student's attempts with its saved answers. An overdue
    /// in-progress attempt is expired before being returned.
    pub async fn get_attempt(
        &self,
        student_id: i64,
        attempt_id: i64,
    ) -> Result<AttemptDetail, AttemptError> {
        let mut attempt = self.owned_attempt(student_id, attempt_id).await?;
        let ExamWithQuestions { exam, .. } = self.load_exam(attempt.exam_id).await?;
        let now = Utc::now();

        if self.validator.is_overdue(&attempt, &exam, now) {
            self.expire(&attempt, now).await?;
            attempt = self
                .store
                .find(attempt.id)
                .await?
                .ok_or(AttemptError::AttemptNotFound)?;
        }

        let answers = self.store.answers(attempt.id).await?;
        Ok(AttemptDetail {
            expires_at: SessionValidator::deadline(attempt.start_time, &exam),
            attempt,
            answers,
        })
    }

    async fn load_exam(&self, exam_id: i64) -> Result<ExamWithQuestions, AttemptError> {
        self.catalog
            .get_exam(exam_id)
            .await?
            .ok_or(AttemptError::ExamNotFound)
    }

    /// Attempts owned by someone else are reported as not found.
    async fn owned_attempt(&self, student_id: i64, attempt_id: i64) -> Result<Attempt, AttemptError> {
        match self.store.find(attempt_id).await? {
            Some(attempt) if attempt.student_id == student_id => Ok(attempt),
            _ => Err(AttemptError::AttemptNotFound),
        }
    }

    /// Rejects writes to an attempt that is finalized or past its window;
    /// an overdue attempt is expired on the way out.
    async fn check_open(
        &self,
        attempt: &Attempt,
        exam: &Exam,
        now: DateTime<Utc>,
    ) -> Result<(), AttemptError> {
        match self.validator.validate_submission(attempt, exam, now) {
            Ok(()) => Ok(()),
            Err(AttemptError::WindowExpired) => {
                self.expire(attempt, now).await?;
                tracing::warn!("Late write rejected on attempt {}", attempt.id);
                Err(AttemptError::WindowExpired)
            }
            Err(reason) => Err(reason),
        }
    }

    async fn expire(&self, attempt: &Attempt, now: DateTime<Utc>) -> Result<(), AttemptError> {
        if self.store.mark_expired(attempt.id, now).await? {
            tracing::info!(
                "Attempt {} expired (student {}, exam {})",
                attempt.id,
                attempt.student_id,
                attempt.exam_id
            );
        }
        Ok(())
    }
}

/// The response for an attempt that is already out of `in_progress`.
fn stored_result(attempt: &Attempt, exam: &Exam) -> Result<SubmissionResult, AttemptError> {
    match attempt.status {
        AttemptStatus::Completed => Ok(build_result(
            attempt.id,
            exam,
            attempt.score.unwrap_or(0),
            attempt.correct_answers.unwrap_or(0),
            attempt.total_questions.unwrap_or(0),
            true,
        )),
        AttemptStatus::Expired => Err(AttemptError::WindowExpired),
        AttemptStatus::InProgress => Err(AttemptError::Storage(format!(
            "attempt {} changed state during submission",
            attempt.id
        ))),
    }
}

fn build_result(
    attempt_id: i64,
    exam: &Exam,
    score: i64,
    correct_answers: i64,
    total_questions: i64,
    replayed: bool,
) -> SubmissionResult {
    SubmissionResult {
        attempt_id,
        score,
        correct_answers,
        total_questions,
        total_marks: exam.total_marks,
        percentage: percentage(score, exam.total_marks),
        passed: score >= exam.passing_marks,
        replayed,
    }
}
