//! Role-scoped projections of stored quizzes and attempts. The password
//! credential never appears in any of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::{AttemptAnswer, AttemptStatus, QuestionType, Quiz, QuizAttempt, QuizQuestion};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub marks: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl QuestionView {
    fn project(question: &QuizQuestion, reveal_answer: bool) -> Self {
        QuestionView {
            id: question.id.clone(),
            text: question.text.clone(),
            question_type: question.question_type,
            options: question.options.clone(),
            marks: question.marks,
            correct_answer: reveal_answer.then(|| question.correct_answer.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizView {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub max_attempts: i32,
    pub passing_score: i32,
    pub total_marks: i32,
    pub allow_review: bool,
    pub show_correct_answers: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionView>,
}

impl QuizView {
    pub fn project(quiz: &Quiz, reveal_answers: bool) -> Self {
        QuizView {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            duration_minutes: quiz.duration_minutes,
            max_attempts: quiz.max_attempts,
            passing_score: quiz.passing_score,
            total_marks: quiz.total_marks(),
            allow_review: quiz.allow_review,
            show_correct_answers: quiz.show_correct_answers,
            deadline: quiz.deadline,
            questions: quiz
                .questions
                .iter()
                .map(|q| QuestionView::project(q, reveal_answers))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: String,
    pub title: String,
    pub passing_score: i32,
    pub allow_review: bool,
    pub show_correct_answers: bool,
    pub question_count: usize,
}

impl QuizSummary {
    pub fn project(quiz: &Quiz) -> Self {
        QuizSummary {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            passing_score: quiz.passing_score,
            allow_review: quiz.allow_review,
            show_correct_answers: quiz.show_correct_answers,
            question_count: quiz.questions.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum QuizProjection {
    Full(QuizView),
    Summary(QuizSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptViewer {
    Owner,
    Staff, // the quiz's lecturer, or an admin
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptView {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<i64>,
    pub score: i32,
    pub total_marks: i32,
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AttemptAnswer>>,
    pub quiz: QuizProjection,
}

impl AttemptView {
    pub fn project(attempt: &QuizAttempt, quiz: &Quiz, viewer: AttemptViewer) -> Self {
        let (answers, quiz) = match viewer {
            AttemptViewer::Staff => (
                Some(attempt.answers.clone()),
                QuizProjection::Full(QuizView::project(quiz, true)),
            ),
            AttemptViewer::Owner if quiz.allow_review => {
                let reveal = quiz.show_correct_answers && attempt.is_terminal();
                (
                    Some(attempt.answers.clone()),
                    QuizProjection::Full(QuizView::project(quiz, reveal)),
                )
            }
            AttemptViewer::Owner => (None, QuizProjection::Summary(QuizSummary::project(quiz))),
        };

        AttemptView {
            id: attempt.id.clone(),
            user_id: attempt.user_id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            start_time: attempt.start_time,
            end_time: attempt.end_time,
            time_taken: attempt.time_taken,
            score: attempt.score,
            total_marks: attempt.total_marks,
            percentage: attempt.percentage,
            answers,
            quiz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_with_password() -> Quiz {
        let mut quiz = Quiz::new(
            "lecturer-1",
            "Capitals",
            5,
            1,
            60,
            vec![QuizQuestion::short_answer("q1", "Capital of France", "Paris", 2)],
        );
        quiz.has_password = true;
        quiz.password_credential = Some("secret".to_string());
        quiz
    }

    fn finished_attempt(quiz: &Quiz) -> QuizAttempt {
        let now = Utc::now();
        let mut attempt = QuizAttempt::start("student-1", &quiz.id, 1, now);
        attempt.apply(&attempt.timed_out_at(now));
        attempt.answers = vec![AttemptAnswer {
            question_id: "q1".to_string(),
            response: "paris".to_string(),
            is_correct: true,
            marks_obtained: 2,
        }];
        attempt
    }

    #[test]
    fn quiz_view_never_carries_the_password() {
        let quiz = quiz_with_password();
        let json = serde_json::to_string(&QuizView::project(&quiz, true)).unwrap();

        assert!(!json.contains("secret"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn quiz_view_hides_correct_answers_unless_revealed() {
        let quiz = quiz_with_password();

        let hidden = QuizView::project(&quiz, false);
        assert!(hidden.questions.iter().all(|q| q.correct_answer.is_none()));

        let revealed = QuizView::project(&quiz, true);
        assert_eq!(revealed.questions[0].correct_answer.as_deref(), Some("Paris"));
    }

    #[test]
    fn owner_without_review_gets_summary_and_no_answers() {
        let mut quiz = quiz_with_password();
        quiz.allow_review = false;
        let attempt = finished_attempt(&quiz);

        let view = AttemptView::project(&attempt, &quiz, AttemptViewer::Owner);
        assert!(view.answers.is_none());
        match view.quiz {
            QuizProjection::Summary(summary) => assert_eq!(summary.question_count, 1),
            QuizProjection::Full(_) => panic!("expected summary projection"),
        }
    }

    #[test]
    fn owner_with_review_sees_answers_per_quiz_flags() {
        let mut quiz = quiz_with_password();
        quiz.allow_review = true;
        quiz.show_correct_answers = false;
        let attempt = finished_attempt(&quiz);

        let view = AttemptView::project(&attempt, &quiz, AttemptViewer::Owner);
        assert_eq!(view.answers.as_ref().map(Vec::len), Some(1));
        match view.quiz {
            QuizProjection::Full(full) => assert!(full.questions[0].correct_answer.is_none()),
            QuizProjection::Summary(_) => panic!("expected full projection"),
        }
    }

    #[test]
    fn staff_always_sees_full_detail() {
        let mut quiz = quiz_with_password();
        quiz.allow_review = false;
        let attempt = finished_attempt(&quiz);

        let view = AttemptView::project(&attempt, &quiz, AttemptViewer::Staff);
        assert!(view.answers.is_some());
        match view.quiz {
            QuizProjection::Full(full) => {
                assert_eq!(full.questions[0].correct_answer.as_deref(), Some("Paris"))
            }
            QuizProjection::Summary(_) => panic!("expected full projection"),
        }
    }

    #[test]
    fn projection_is_tagged_on_the_wire() {
        let quiz = quiz_with_password();
        let json = serde_json::to_value(QuizProjection::Summary(QuizSummary::project(&quiz))).unwrap();
        assert_eq!(json["view"], "summary");
        assert_eq!(json["title"], "Capitals");
    }
}
