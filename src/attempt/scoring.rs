//! Scoring engine. Pure functions over questions and submitted answers.

use std::collections::HashMap;

use crate::models::question::Question;

/// Result of scoring one answer set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub correct_count: i64,
    pub total_score: i64,
}

/// Normalizes an option letter: trims, uppercases, and accepts only A-D.
pub fn normalize_option(raw: &str) -> Option<char> {
    let mut chars = raw.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() {
        return None;
    }
    matches!(letter, 'A'..='D').then_some(letter)
}

/// Whether `selected` is the correct option for `question`.
/// Unanswered or invalid selections are simply incorrect.
pub fn grade(question: &Question, selected: Option<&str>) -> bool {
    match (selected.and_then(normalize_option), normalize_option(&question.correct_answer)) {
        (Some(given), Some(expected)) => given == expected,
        _ => false,
    }
}

/// Scores `answers` (question id -> selected letter) against `questions`.
///
/// Answers for question ids that are not part of `questions` are ignored;
/// questions without an answer contribute nothing.
pub fn score(questions: &[Question], answers: &HashMap<i64, String>) -> Score {
    questions
        .iter()
        .filter(|q| grade(q, answers.get(&q.id).map(String::as_str)))
        .fold(Score::default(), |acc, q| Score {
            correct_count: acc.correct_count + 1,
            total_score: acc.total_score + q.marks,
        })
}

/// `score / total_marks * 100`, or 0 when the exam has no marks.
pub fn percentage(score: i64, total_marks: i64) -> f64 {
    if total_marks > 0 {
        score as f64 / total_marks as f64 * 100.0
    } else {
        0.0
    }
}
