use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    models::{
        domain::{AttemptStatus, Quiz, QuizAttempt},
        dto::views::QuizView,
    },
    services::scoring::letter_grade,
};

/// What a student sees after submitting. Derived only from the stored
/// attempt, so replaying a submit yields the same body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub attempt_id: String,
    pub quiz_id: String,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_marks: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub allow_review: bool,
    pub show_correct_answers: bool,
}

impl AttemptResult {
    pub fn from_attempt(attempt: &QuizAttempt, quiz: &Quiz) -> Self {
        Self::project(attempt, Some(quiz))
    }

    /// Result for an attempt whose quiz record is gone. Pass/fail is unknown
    /// and the review flags fall back to their restrictive values.
    pub fn without_quiz(attempt: &QuizAttempt) -> Self {
        Self::project(attempt, None)
    }

    fn project(attempt: &QuizAttempt, quiz: Option<&Quiz>) -> Self {
        let graded = attempt.status == AttemptStatus::Completed;

        AttemptResult {
            attempt_id: attempt.id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            score: graded.then_some(attempt.score),
            total_marks: graded.then_some(attempt.total_marks),
            percentage: graded.then_some(attempt.percentage),
            grade: graded.then(|| letter_grade(attempt.percentage).to_string()),
            passed: quiz
                .filter(|_| graded)
                .map(|q| attempt.percentage >= f64::from(q.passing_score)),
            time_taken: attempt.time_taken,
            end_time: attempt.end_time,
            allow_review: quiz.is_some_and(|q| q.allow_review),
            show_correct_answers: quiz.is_some_and(|q| q.show_correct_answers),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt: QuizAttempt,
    pub quiz: QuizView,
    pub resumed: bool,
    /// Absent when the quiz duration has no representable end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutAck {
    pub attempt_id: String,
    pub status: AttemptStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{AttemptAnswer, Finalization, QuizQuestion};

    fn quiz() -> Quiz {
        Quiz::new(
            "lecturer-1",
            "Arithmetic",
            10,
            3,
            70,
            vec![QuizQuestion::mcq("q1", "2+2?", &["4", "5"], "4", 10)],
        )
    }

    #[test]
    fn completed_attempt_reports_score_grade_and_pass() {
        let quiz = quiz();
        let now = Utc::now();
        let mut attempt = QuizAttempt::start("student-1", &quiz.id, 1, now);
        attempt.apply(&Finalization::Completed {
            answers: vec![AttemptAnswer {
                question_id: "q1".to_string(),
                response: "4".to_string(),
                is_correct: true,
                marks_obtained: 10,
            }],
            score: 10,
            total_marks: 10,
            percentage: 100.0,
            end_time: now,
            time_taken: 0,
        });

        let result = AttemptResult::from_attempt(&attempt, &quiz);
        assert_eq!(result.status, AttemptStatus::Completed);
        assert_eq!(result.score, Some(10));
        assert_eq!(result.grade.as_deref(), Some("A+"));
        assert_eq!(result.passed, Some(true));
    }

    #[test]
    fn timed_out_attempt_reports_no_score() {
        let quiz = quiz();
        let now = Utc::now();
        let mut attempt = QuizAttempt::start("student-1", &quiz.id, 1, now);
        attempt.apply(&attempt.timed_out_at(now));

        let result = AttemptResult::from_attempt(&attempt, &quiz);
        assert_eq!(result.status, AttemptStatus::Timeout);
        assert!(result.score.is_none());
        assert!(result.percentage.is_none());
        assert!(result.passed.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("score").is_none());
    }

    #[test]
    fn result_without_quiz_keeps_stored_score() {
        let quiz = quiz();
        let now = Utc::now();
        let mut attempt = QuizAttempt::start("student-1", &quiz.id, 1, now);
        attempt.apply(&Finalization::Completed {
            answers: vec![],
            score: 7,
            total_marks: 10,
            percentage: 70.0,
            end_time: now,
            time_taken: 12,
        });

        let result = AttemptResult::without_quiz(&attempt);
        assert_eq!(result.score, Some(7));
        assert_eq!(result.grade.as_deref(), Some("B"));
        assert_eq!(result.passed, None);
        assert!(!result.allow_review);
        assert!(!result.show_correct_answers);
    }
}
