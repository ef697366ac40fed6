use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub id: String,
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>, // mcq only, at least two
    pub correct_answer: String,
    pub marks: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    ShortAnswer,
}

impl QuizQuestion {
    pub fn mcq(id: &str, text: &str, options: &[&str], correct_answer: &str, marks: i32) -> Self {
        QuizQuestion {
            id: id.to_string(),
            text: text.to_string(),
            question_type: QuestionType::Mcq,
            options: Some(options.iter().map(|o| o.to_string()).collect()),
            correct_answer: correct_answer.to_string(),
            marks,
        }
    }

    pub fn true_false(id: &str, text: &str, correct_answer: &str, marks: i32) -> Self {
        QuizQuestion {
            id: id.to_string(),
            text: text.to_string(),
            question_type: QuestionType::TrueFalse,
            options: None,
            correct_answer: correct_answer.to_string(),
            marks,
        }
    }

    pub fn short_answer(id: &str, text: &str, correct_answer: &str, marks: i32) -> Self {
        QuizQuestion {
            id: id.to_string(),
            text: text.to_string(),
            question_type: QuestionType::ShortAnswer,
            options: None,
            correct_answer: correct_answer.to_string(),
            marks,
        }
    }
}
