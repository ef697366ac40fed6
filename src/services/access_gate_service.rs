use std::sync::Arc;

use chrono::Duration;

use crate::{
    auth::{verify_credential, CredentialCheck, JwtService, QUIZ_ACCESS_TOKEN_TYPE},
    clock::Clock,
    errors::{AppError, AppResult},
    models::{domain::Quiz, dto::response::AccessTokenResponse},
    repositories::QuizRepository,
};

/// Password challenge for gated quizzes. Every failure looks the same to the caller.
pub struct AccessGateService {
    quiz_repository: Arc<dyn QuizRepository>,
    jwt_service: Arc<JwtService>,
    clock: Arc<dyn Clock>,
    token_ttl: Duration,
}

impl AccessGateService {
    pub fn new(
        quiz_repository: Arc<dyn QuizRepository>,
        jwt_service: Arc<JwtService>,
        clock: Arc<dyn Clock>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            quiz_repository,
            jwt_service,
            clock,
            token_ttl,
        }
    }

    /// Checks `password` against the quiz credential, upgrading a legacy
    /// plaintext credential on success, and issues a quiz access token.
    pub async fn verify_quiz_password(
        &self,
        quiz_id: &str,
        user_id: &str,
        password: &str,
    ) -> AppResult<AccessTokenResponse> {
        let quiz = self
            .quiz_repository
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(AppError::access_denied)?;

        match self.verify(&quiz, password)? {
            CredentialCheck::Rejected => {
                log::debug!("Password challenge failed for quiz {}", quiz_id);
                return Err(AppError::access_denied());
            }
            CredentialCheck::Accepted {
                upgraded_hash: Some(hash),
            } => {
                // The challenge already passed; a failed rewrite only delays the upgrade.
                match self
                    .quiz_repository
                    .update_password_credential(quiz_id, &hash, self.clock.now())
                    .await
                {
                    Ok(()) => log::info!("Upgraded legacy password credential for quiz {}", quiz_id),
                    Err(e) => log::error!(
                        "Failed to persist upgraded credential for quiz {}: {}",
                        quiz_id,
                        e
                    ),
                }
            }
            CredentialCheck::Accepted {
                upgraded_hash: None,
            } => {}
        }

        let access_token = self.issue_token(user_id, quiz_id)?;

        Ok(AccessTokenResponse {
            access_token,
            token_type: QUIZ_ACCESS_TOKEN_TYPE.to_string(),
            expires_in: self.token_ttl.num_seconds(),
        })
    }

    /// A quiz without a password rejects every attempt, like a wrong password.
    pub fn verify(&self, quiz: &Quiz, password: &str) -> AppResult<CredentialCheck> {
        if !quiz.is_password_protected() {
            return Ok(CredentialCheck::Rejected);
        }
        verify_credential(quiz.password_credential.as_deref(), password)
    }

    pub fn issue_token(&self, user_id: &str, quiz_id: &str) -> AppResult<String> {
        self.jwt_service
            .create_quiz_access_token(user_id, quiz_id, self.clock.now(), self.token_ttl)
    }

    pub fn check_token(&self, token: Option<&str>, quiz_id: &str, user_id: &str) -> bool {
        token.is_some_and(|t| {
            self.jwt_service
                .verify_quiz_access_token(t, quiz_id, user_id, self.clock.now())
        })
    }
}
