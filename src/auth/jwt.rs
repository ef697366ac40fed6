use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth::claims::{Claims, QuizAccessClaims, UserRole},
    errors::{AppError, AppResult},
};

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    // expiry of quiz-access tokens is checked against the service clock instead
    access_validation: Validation,
    expiration_hours: i64,
}

impl JwtService {
    pub fn new(secret: &SecretString, expiration_hours: i64) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();

        let mut access_validation = Validation::default();
        access_validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation: Validation::default(),
            access_validation,
            expiration_hours,
        }
    }

    pub fn create_token(&self, user_id: &str, role: UserRole) -> AppResult<String> {
        let claims = Claims::new(user_id, role, self.expiration_hours);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to create JWT: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    pub fn create_quiz_access_token(
        &self,
        user_id: &str,
        quiz_id: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<String> {
        let claims = QuizAccessClaims::new(user_id, quiz_id, issued_at, ttl);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to create access token: {}", e)))
    }

    /// Signature, purpose, binding and expiry in one yes/no answer.
    pub fn verify_quiz_access_token(
        &self,
        token: &str,
        quiz_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        decode::<QuizAccessClaims>(token, &self.decoding_key, &self.access_validation)
            .map(|data| data.claims.authorizes(quiz_id, user_id, now))
            .unwrap_or(false)
    }
}
