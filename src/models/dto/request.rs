use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct QuizAccessRequest {
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_unique_question_ids"))]
pub struct SubmitAttemptRequest {
    #[validate(length(min = 1, message = "At least one answer is required"), nested)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AnswerInput {
    #[validate(length(min = 1, max = 100))]
    pub question_id: String,

    #[validate(length(max = 10000))]
    #[serde(default)]
    pub response: String,
}

impl AnswerInput {
    pub fn new(question_id: &str, response: &str) -> Self {
        AnswerInput {
            question_id: question_id.to_string(),
            response: response.to_string(),
        }
    }
}

fn validate_unique_question_ids(request: &SubmitAttemptRequest) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    if request
        .answers
        .iter()
        .all(|answer| seen.insert(answer.question_id.as_str()))
    {
        Ok(())
    } else {
        Err(ValidationError::new("duplicate_question_id"))
    }
}
