// tests/lifecycle_tests.rs
//
// Drives the attempt lifecycle controller directly against a file-backed
// SQLite database so that concurrent requests really race.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use exam_backend::{
    attempt::{
        AttemptError, AttemptLifecycle, AttemptStore,
        store::{Finalization, GradedAnswer},
    },
    catalog::SqlExamCatalog,
    db,
    models::attempt::{AttemptStatus, SubmittedAnswer},
};
use sqlx::SqlitePool;

struct TestDb {
    pool: SqlitePool,
    path: PathBuf,
}

impl TestDb {
    async fn new() -> Self {
        let path = std::env::temp_dir().join(format!("exam_backend_{}.db", uuid::Uuid::new_v4()));
        let url = format!("sqlite://{}", path.display());
        let pool = db::connect(&url, 8).await.expect("Failed to open test database");
        db::run_migrations(&pool).await.expect("Failed to migrate database");
        Self { pool, path }
    }

    fn lifecycle(&self) -> AttemptLifecycle {
        AttemptLifecycle::new(
            self.pool.clone(),
            Arc::new(SqlExamCatalog::new(self.pool.clone())),
            Duration::seconds(30),
        )
    }

    async fn student(&self, name: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (username, password, role, created_at) \
             VALUES (?, 'unused', 'student', ?) RETURNING id",
        )
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    /// Two questions: (A, 1 mark) and (C, 2 marks).
    async fn exam(&self, active: bool) -> (i64, i64, i64) {
        let now = Utc::now();
        let exam_id: i64 = sqlx::query_scalar(
            "INSERT INTO exams \
                (title, duration_minutes, total_marks, passing_marks, is_active, created_at, updated_at) \
             VALUES ('Lifecycle', 30, 3, 2, ?, ?, ?) RETURNING id",
        )
        .bind(active)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .unwrap();

        let mut ids = Vec::new();
        for (correct, marks) in [("A", 1i64), ("C", 2i64)] {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO questions \
                    (exam_id, question_text, option_a, option_b, option_c, option_d, correct_answer, marks, created_at) \
                 VALUES (?, 'q', 'a', 'b', 'c', 'd', ?, ?, ?) RETURNING id",
            )
            .bind(exam_id)
            .bind(correct)
            .bind(marks)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .unwrap();
            ids.push(id);
        }

        (exam_id, ids[0], ids[1])
    }

    async fn close(self) {
        self.pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

fn answer(question_id: i64, letter: &str) -> SubmittedAnswer {
    SubmittedAnswer {
        question_id,
        selected_answer: Some(letter.to_string()),
    }
}

#[tokio::test]
async fn concurrent_starts_create_one_attempt() {
    let db = TestDb::new().await;
    let student = db.student("racer").await;
    let (exam_id, _, _) = db.exam(true).await;
    let lifecycle = db.lifecycle();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let lifecycle = lifecycle.clone();
        handles.push(tokio::spawn(async move {
            lifecycle.start_attempt(student, exam_id).await
        }));
    }

    let mut started = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => started += 1,
            Err(AttemptError::DuplicateAttempt) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(started, 1);

    let in_progress: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attempts WHERE student_id = ? AND exam_id = ? AND status = 'in_progress'",
    )
    .bind(student)
    .bind(exam_id)
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(in_progress, 1);

    db.close().await;
}

#[tokio::test]
async fn concurrent_submits_score_once() {
    let db = TestDb::new().await;
    let student = db.student("double_clicker").await;
    let (exam_id, q1, q2) = db.exam(true).await;
    let lifecycle = db.lifecycle();

    let attempt_id = lifecycle.start_attempt(student, exam_id).await.unwrap().attempt_id;

    let mut handles = Vec::new();
    for i in 0..6 {
        let lifecycle = lifecycle.clone();
        // Different payloads so a double score would be visible
        let answers = if i % 2 == 0 {
            vec![answer(q1, "A"), answer(q2, "C")]
        } else {
            vec![answer(q1, "B")]
        };
        handles.push(tokio::spawn(async move {
            lifecycle.submit_attempt(student, attempt_id, &answers).await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().expect("submit should succeed or replay"));
    }

    let fresh: Vec<_> = results.iter().filter(|r| !r.replayed).collect();
    assert_eq!(fresh.len(), 1, "exactly one submission is scored");
    for r in &results {
        assert_eq!(r.score, fresh[0].score);
        assert_eq!(r.correct_answers, fresh[0].correct_answers);
    }

    let stored = lifecycle.get_attempt(student, attempt_id).await.unwrap();
    assert_eq!(stored.attempt.status, AttemptStatus::Completed);
    assert_eq!(stored.attempt.score, Some(fresh[0].score));
    assert_eq!(stored.answers.len(), 2);

    db.close().await;
}

#[tokio::test]
async fn same_answers_score_identically_across_attempts() {
    let db = TestDb::new().await;
    let (exam_id, q1, q2) = db.exam(true).await;
    let lifecycle = db.lifecycle();
    let answers = vec![answer(q1, "a"), answer(q2, "B")];

    let mut scores = Vec::new();
    for name in ["first", "second"] {
        let student = db.student(name).await;
        let attempt_id = lifecycle.start_attempt(student, exam_id).await.unwrap().attempt_id;
        let result = lifecycle.submit_attempt(student, attempt_id, &answers).await.unwrap();
        scores.push((result.correct_answers, result.score));
    }

    assert_eq!(scores[0], (1, 1));
    assert_eq!(scores[0], scores[1]);

    db.close().await;
}

#[tokio::test]
async fn inactive_exam_never_creates_attempt() {
    let db = TestDb::new().await;
    let student = db.student("early_bird").await;
    let (exam_id, _, _) = db.exam(false).await;
    let lifecycle = db.lifecycle();

    assert_eq!(
        lifecycle.start_attempt(student, exam_id).await.unwrap_err(),
        AttemptError::ExamInactive
    );
    assert!(lifecycle.list_attempts(student).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn overdue_attempt_is_expired_on_read() {
    let db = TestDb::new().await;
    let student = db.student("sleeper").await;
    let (exam_id, q1, _) = db.exam(true).await;
    let lifecycle = db.lifecycle();

    let attempt_id = lifecycle.start_attempt(student, exam_id).await.unwrap().attempt_id;
    sqlx::query("UPDATE attempts SET start_time = ? WHERE id = ?")
        .bind(Utc::now() - Duration::hours(1))
        .bind(attempt_id)
        .execute(&db.pool)
        .await
        .unwrap();

    let detail = lifecycle.get_attempt(student, attempt_id).await.unwrap();
    assert_eq!(detail.attempt.status, AttemptStatus::Expired);
    assert!(detail.attempt.score.is_none());

    assert_eq!(
        lifecycle
            .record_answers(student, attempt_id, &[answer(q1, "A")])
            .await
            .unwrap_err(),
        AttemptError::AlreadyFinalized
    );
    assert_eq!(
        lifecycle
            .submit_attempt(student, attempt_id, &[answer(q1, "A")])
            .await
            .unwrap_err(),
        AttemptError::WindowExpired
    );

    db.close().await;
}

#[tokio::test]
async fn failed_finalize_leaves_attempt_in_progress() {
    let db = TestDb::new().await;
    let student = db.student("unlucky").await;
    let (exam_id, q1, _) = db.exam(true).await;
    let lifecycle = db.lifecycle();

    let attempt_id = lifecycle.start_attempt(student, exam_id).await.unwrap().attempt_id;

    // The second answer row violates the questions foreign key, so the
    // insert fails after the status swap inside the same transaction.
    let outcome = Finalization {
        end_time: Utc::now(),
        score: 1,
        correct_answers: 1,
        total_questions: 2,
        answers: vec![
            GradedAnswer {
                question_id: q1,
                selected_answer: Some("A".to_string()),
                is_correct: true,
            },
            GradedAnswer {
                question_id: i64::MAX,
                selected_answer: Some("B".to_string()),
                is_correct: false,
            },
        ],
    };
    let err = AttemptStore::new(db.pool.clone())
        .finalize(attempt_id, &outcome)
        .await
        .unwrap_err();
    assert!(matches!(err, AttemptError::Storage(_)));
    assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
    assert!(err.is_retryable());

    let row: (String, Option<i64>) =
        sqlx::query_as("SELECT status, score FROM attempts WHERE id = ?")
            .bind(attempt_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(row, ("in_progress".to_string(), None));

    let answer_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answers WHERE attempt_id = ?")
        .bind(attempt_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(answer_rows, 0);

    // A retry goes through and is scored once
    let result = lifecycle
        .submit_attempt(student, attempt_id, &[answer(q1, "A")])
        .await
        .unwrap();
    assert!(!result.replayed);
    assert_eq!(result.score, 1);

    db.close().await;
}
