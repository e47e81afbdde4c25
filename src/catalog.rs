//! Read-only view of the exam/question catalog consumed by the attempt lifecycle.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::models::{exam::Exam, question::Question};

/// An exam together with its ordered questions.
#[derive(Debug, Clone)]
pub struct ExamWithQuestions {
    pub exam: Exam,
    pub questions: Vec<Question>,
}

#[async_trait]
pub trait ExamCatalog: Send + Sync {
    /// Loads an exam and its questions (ordered by id). `None` if it does not exist.
    async fn get_exam(&self, exam_id: i64) -> Result<Option<ExamWithQuestions>, sqlx::Error>;

    /// Whether the exam accepts new attempts. `None` if it does not exist.
    async fn is_active(&self, exam_id: i64) -> Result<Option<bool>, sqlx::Error>;
}

/// Catalog backed by the `exams` and `questions` tables.
#[derive(Clone)]
pub struct SqlExamCatalog {
    pool: SqlitePool,
}

impl SqlExamCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) const EXAM_COLUMNS: &str = "id, title, description, duration_minutes, total_marks, \
     passing_marks, is_active, created_at, updated_at";

pub(crate) const QUESTION_COLUMNS: &str = "id, exam_id, question_text, option_a, option_b, \
     option_c, option_d, correct_answer, marks, image_url, created_at";

#[async_trait]
impl ExamCatalog for SqlExamCatalog {
    async fn get_exam(&self, exam_id: i64) -> Result<Option<ExamWithQuestions>, sqlx::Error> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {} FROM exams WHERE id = ?",
            EXAM_COLUMNS
        ))
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(exam) = exam else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {} FROM questions WHERE exam_id = ? ORDER BY id",
            QUESTION_COLUMNS
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ExamWithQuestions { exam, questions }))
    }

    async fn is_active(&self, exam_id: i64) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT is_active FROM exams WHERE id = ?")
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await
    }
}
