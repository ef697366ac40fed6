use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const QUIZ_ACCESS_TOKEN_TYPE: &str = "quiz_access";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Lecturer,
    Admin,
}

/// Session claims issued by the login service and checked on every API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    pub role: UserRole,
    pub exp: usize, // Expiration time (as UTC timestamp)
    pub iat: usize, // Issued at (as UTC timestamp)
}

impl Claims {
    pub fn new(user_id: &str, role: UserRole, expiration_hours: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours);

        Self {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        }
    }
}

/// Proof that `sub` passed the password challenge of `quiz_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAccessClaims {
    pub sub: String, // user id
    pub quiz_id: String,
    pub token_type: String, // "quiz_access"
    pub iat: i64,
    pub exp: i64,
}

impl QuizAccessClaims {
    pub fn new(user_id: &str, quiz_id: &str, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            quiz_id: quiz_id.to_string(),
            token_type: QUIZ_ACCESS_TOKEN_TYPE.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// True only for an unexpired quiz-access claim bound to exactly this user and quiz.
    pub fn authorizes(&self, quiz_id: &str, user_id: &str, now: DateTime<Utc>) -> bool {
        self.token_type == QUIZ_ACCESS_TOKEN_TYPE
            && self.quiz_id == quiz_id
            && self.sub == user_id
            && now.timestamp() < self.exp
    }
}
