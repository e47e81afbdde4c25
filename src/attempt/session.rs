//! Session rules: who may start an attempt, and whether a submission still
//! falls inside its time window.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::{
    attempt::{AttemptError, scoring::normalize_option},
    models::{
        attempt::{Attempt, AttemptStatus, SubmittedAnswer},
        exam::Exam,
        question::Question,
    },
};

#[derive(Debug, Clone, Copy)]
pub struct SessionValidator {
    grace: Duration,
}

impl SessionValidator {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace: grace.max(Duration::zero()),
        }
    }

    /// The deadline shown to the client: `start_time + duration`.
    pub fn deadline(start_time: DateTime<Utc>, exam: &Exam) -> DateTime<Utc> {
        start_time + exam.duration()
    }

    /// Past the deadline plus grace. Only in-progress attempts can be overdue.
    pub fn is_overdue(&self, attempt: &Attempt, exam: &Exam, now: DateTime<Utc>) -> bool {
        attempt.status == AttemptStatus::InProgress
            && now > Self::deadline(attempt.start_time, exam) + self.grace
    }

    /// Checks whether a new attempt may start.
    ///
    /// `in_progress` is the student's current in-progress attempt for this exam, if any.
    pub fn can_start(&self, exam: &Exam, in_progress: Option<&Attempt>) -> Result<(), AttemptError> {
        if !exam.is_active {
            return Err(AttemptError::ExamInactive);
        }
        if in_progress.is_some() {
            return Err(AttemptError::DuplicateAttempt);
        }
        Ok(())
    }

    /// Checks whether `attempt` may still accept answers at `now`.
    pub fn validate_submission(
        &self,
        attempt: &Attempt,
        exam: &Exam,
        now: DateTime<Utc>,
    ) -> Result<(), AttemptError> {
        if attempt.status != AttemptStatus::InProgress {
            return Err(AttemptError::AlreadyFinalized);
        }
        if self.is_overdue(attempt, exam, now) {
            return Err(AttemptError::WindowExpired);
        }
        Ok(())
    }
}

/// Validates a client answer payload against the exam's questions.
///
/// Returns `question id -> normalized letter`, with `None` for questions the
/// client explicitly left blank. Unknown or repeated question ids and
/// selections outside A-D are rejected.
pub fn validate_answers(
    questions: &[Question],
    answers: &[SubmittedAnswer],
) -> Result<HashMap<i64, Option<String>>, AttemptError> {
    let known: HashSet<i64> = questions.iter().map(|q| q.id).collect();
    let mut normalized = HashMap::with_capacity(answers.len());

    for answer in answers {
        if !known.contains(&answer.question_id) {
            return Err(AttemptError::InvalidAnswerPayload(format!(
                "question {} does not belong to this exam",
                answer.question_id
            )));
        }

        let selected = answer.selected_answer.as_deref().map(str::trim).unwrap_or("");
        let letter = if selected.is_empty() {
            None
        } else {
            let letter = normalize_option(selected).ok_or_else(|| {
                AttemptError::InvalidAnswerPayload(format!(
                    "'{}' is not a valid option for question {}",
                    selected, answer.question_id
                ))
            })?;
            Some(letter.to_string())
        };

        if normalized.insert(answer.question_id, letter).is_some() {
            return Err(AttemptError::InvalidAnswerPayload(format!(
                "question {} answered more than once",
                answer.question_id
            )));
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam(active: bool, duration_minutes: i64) -> Exam {
        let now = Utc::now();
        Exam {
            id: 1,
            title: "Algebra".to_string(),
            description: None,
            duration_minutes,
            total_marks: 10,
            passing_marks: 5,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    fn attempt(status: AttemptStatus, start_time: DateTime<Utc>) -> Attempt {
        Attempt {
            id: 7,
            student_id: 3,
            exam_id: 1,
            status,
            start_time,
            end_time: None,
            score: None,
            correct_answers: None,
            total_questions: None,
        }
    }

    fn question(id: i64) -> Question {
        Question {
            id,
            exam_id: 1,
            question_text: "q".to_string(),
            option_a: "a".to_string(),
            option_b: "b".to_string(),
            option_c: "c".to_string(),
            option_d: "d".to_string(),
            correct_answer: "A".to_string(),
            marks: 1,
            image_url: None,
            created_at: None,
        }
    }

    fn answer(question_id: i64, selected: Option<&str>) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            selected_answer: selected.map(str::to_string),
        }
    }

    #[test]
    fn test_can_start_rejects_inactive_exam() {
        let validator = SessionValidator::new(Duration::seconds(30));
        let existing = attempt(AttemptStatus::InProgress, Utc::now());
        assert_eq!(
            validator.can_start(&exam(false, 30), None),
            Err(AttemptError::ExamInactive)
        );
        // Inactive wins over duplicate
        assert_eq!(
            validator.can_start(&exam(false, 30), Some(&existing)),
            Err(AttemptError::ExamInactive)
        );
    }

    #[test]
    fn test_can_start_rejects_duplicate() {
        let validator = SessionValidator::new(Duration::seconds(30));
        let existing = attempt(AttemptStatus::InProgress, Utc::now());
        assert_eq!(
            validator.can_start(&exam(true, 30), Some(&existing)),
            Err(AttemptError::DuplicateAttempt)
        );
        assert_eq!(validator.can_start(&exam(true, 30), None), Ok(()));
    }

    #[test]
    fn test_validate_submission_within_window() {
        let validator = SessionValidator::new(Duration::seconds(30));
        let start = Utc::now() - Duration::minutes(10);
        let a = attempt(AttemptStatus::InProgress, start);
        assert_eq!(validator.validate_submission(&a, &exam(true, 30), Utc::now()), Ok(()));
    }

    #[test]
    fn test_validate_submission_grace_period() {
        let validator = SessionValidator::new(Duration::seconds(30));
        let start = Utc::now();
        let a = attempt(AttemptStatus::InProgress, start);
        let e = exam(true, 30);

        let inside_grace = start + Duration::minutes(30) + Duration::seconds(20);
        assert_eq!(validator.validate_submission(&a, &e, inside_grace), Ok(()));

        let after_grace = start + Duration::minutes(30) + Duration::seconds(31);
        assert_eq!(
            validator.validate_submission(&a, &e, after_grace),
            Err(AttemptError::WindowExpired)
        );
    }

    #[test]
    fn test_validate_submission_rejects_terminal_states() {
        let validator = SessionValidator::new(Duration::zero());
        let e = exam(true, 30);
        for status in [AttemptStatus::Completed, AttemptStatus::Expired] {
            let a = attempt(status, Utc::now());
            assert_eq!(
                validator.validate_submission(&a, &e, Utc::now()),
                Err(AttemptError::AlreadyFinalized)
            );
        }
    }

    #[test]
    fn test_validate_answers_normalizes_letters_and_blanks() {
        let questions = vec![question(1), question(2), question(3)];
        let payload = vec![answer(1, Some("b")), answer(2, Some("  ")), answer(3, None)];
        let normalized = validate_answers(&questions, &payload).unwrap();
        assert_eq!(normalized.len(), 3);
        assert_eq!(normalized[&1].as_deref(), Some("B"));
        assert_eq!(normalized[&2], None);
        assert_eq!(normalized[&3], None);
    }

    #[test]
    fn test_validate_answers_rejects_bad_payloads() {
        let questions = vec![question(1), question(2)];

        let unknown = validate_answers(&questions, &[answer(9, Some("A"))]);
        assert!(matches!(unknown, Err(AttemptError::InvalidAnswerPayload(_))));

        let repeated = validate_answers(&questions, &[answer(1, Some("A")), answer(1, Some("B"))]);
        assert!(matches!(repeated, Err(AttemptError::InvalidAnswerPayload(_))));

        let bad_letter = validate_answers(&questions, &[answer(2, Some("F"))]);
        assert!(matches!(bad_letter, Err(AttemptError::InvalidAnswerPayload(_))));
    }
}
