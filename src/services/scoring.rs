//! Server-side grading. Pure functions over the stored quiz and the submitted
//! answers; client-reported scores never enter here.

use std::collections::HashMap;

use crate::models::{
    domain::{AttemptAnswer, QuestionType, QuizQuestion},
    dto::request::AnswerInput,
};

#[derive(Clone, Debug, PartialEq)]
pub struct GradedSubmission {
    pub answers: Vec<AttemptAnswer>,
    pub score: i32,
    pub total_marks: i32,
    pub percentage: f64,
}

/// Grades every question of the quiz, in quiz order. Answers are matched by
/// question id; a question without an answer scores zero with an empty response.
/// Answers for unknown question ids are ignored.
pub fn grade_submission(questions: &[QuizQuestion], submitted: &[AnswerInput]) -> GradedSubmission {
    let responses: HashMap<&str, &str> = submitted
        .iter()
        .map(|a| (a.question_id.as_str(), a.response.as_str()))
        .collect();

    let answers: Vec<AttemptAnswer> = questions
        .iter()
        .map(|question| {
            let response = responses.get(question.id.as_str()).copied();
            let is_correct = response.is_some_and(|r| is_correct(question, r));

            AttemptAnswer {
                question_id: question.id.clone(),
                response: response.unwrap_or_default().to_string(),
                is_correct,
                marks_obtained: if is_correct { question.marks } else { 0 },
            }
        })
        .collect();

    let total_marks: i32 = questions.iter().map(|q| q.marks).sum();
    let score: i32 = answers.iter().map(|a| a.marks_obtained).sum();

    GradedSubmission {
        answers,
        score,
        total_marks,
        percentage: percentage(score, total_marks),
    }
}

pub fn is_correct(question: &QuizQuestion, response: &str) -> bool {
    let response = response.trim();
    let expected = question.correct_answer.trim();

    match question.question_type {
        QuestionType::Mcq => response == expected,
        QuestionType::TrueFalse | QuestionType::ShortAnswer => {
            response.to_lowercase() == expected.to_lowercase()
        }
    }
}

pub fn percentage(score: i32, total_marks: i32) -> f64 {
    if total_marks > 0 {
        100.0 * f64::from(score) / f64::from(total_marks)
    } else {
        0.0
    }
}

const GRADE_BOUNDARIES: [(f64, &str); 11] = [
    (90.0, "A+"),
    (85.0, "A"),
    (80.0, "A-"),
    (75.0, "B+"),
    (70.0, "B"),
    (65.0, "B-"),
    (60.0, "C+"),
    (55.0, "C"),
    (50.0, "C-"),
    (45.0, "D+"),
    (40.0, "D"),
];

pub fn letter_grade(percentage: f64) -> &'static str {
    GRADE_BOUNDARIES
        .iter()
        .find(|(floor, _)| percentage >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or("F")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arithmetic_questions() -> Vec<QuizQuestion> {
        vec![
            QuizQuestion::mcq("q1", "2+2?", &["4", "5"], "4", 10),
            QuizQuestion::true_false("q2", "1 is odd", "True", 5),
        ]
    }

    #[test]
    fn full_marks_with_case_insensitive_true_false() {
        let graded = grade_submission(
            &arithmetic_questions(),
            &[AnswerInput::new("q1", "4"), AnswerInput::new("q2", "true")],
        );

        assert_eq!(graded.score, 15);
        assert_eq!(graded.total_marks, 15);
        assert_eq!(graded.percentage, 100.0);
        assert!(graded.answers.iter().all(|a| a.is_correct));
    }

    #[test]
    fn omitted_question_scores_zero_with_empty_response() {
        let graded = grade_submission(&arithmetic_questions(), &[AnswerInput::new("q1", "5")]);

        assert_eq!(graded.score, 0);
        assert_eq!(graded.percentage, 0.0);
        assert_eq!(graded.total_marks, 15);

        let q2 = graded.answers.iter().find(|a| a.question_id == "q2").unwrap();
        assert!(!q2.is_correct);
        assert_eq!(q2.response, "");
        assert_eq!(q2.marks_obtained, 0);
    }

    #[test]
    fn answers_are_matched_by_id_not_position() {
        let graded = grade_submission(
            &arithmetic_questions(),
            &[AnswerInput::new("q2", "TRUE"), AnswerInput::new("q1", " 4 ")],
        );

        assert_eq!(graded.score, 15);
        assert_eq!(graded.answers[0].question_id, "q1");
        assert_eq!(graded.answers[0].response, " 4 ");
    }

    #[test]
    fn mcq_is_case_sensitive() {
        let question = QuizQuestion::mcq("q1", "Pick", &["Paris", "paris"], "Paris", 1);
        assert!(is_correct(&question, " Paris"));
        assert!(!is_correct(&question, "paris"));
    }

    #[test]
    fn short_answer_requires_exact_match_ignoring_case() {
        let question = QuizQuestion::short_answer("q1", "Capital of France", "Paris", 3);
        assert!(is_correct(&question, "  PARIS "));
        assert!(!is_correct(&question, "Paris, France"));
    }

    #[test]
    fn unknown_question_ids_are_ignored() {
        let graded = grade_submission(&arithmetic_questions(), &[AnswerInput::new("q9", "4")]);
        assert_eq!(graded.answers.len(), 2);
        assert_eq!(graded.score, 0);
    }

    #[test]
    fn empty_quiz_has_zero_percentage() {
        let graded = grade_submission(&[], &[AnswerInput::new("q1", "4")]);
        assert_eq!(graded.total_marks, 0);
        assert_eq!(graded.percentage, 0.0);
    }

    #[test]
    fn letter_grade_breakpoints() {
        assert_eq!(letter_grade(100.0), "A+");
        assert_eq!(letter_grade(90.0), "A+");
        assert_eq!(letter_grade(89.99), "A");
        assert_eq!(letter_grade(80.0), "A-");
        assert_eq!(letter_grade(72.5), "B");
        assert_eq!(letter_grade(50.0), "C-");
        assert_eq!(letter_grade(40.0), "D");
        assert_eq!(letter_grade(39.9), "F");
        assert_eq!(letter_grade(0.0), "F");
    }
}
