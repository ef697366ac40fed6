use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    Rejected,
    /// `upgraded_hash` is set when the stored credential was legacy plaintext
    /// and must be replaced by the caller.
    Accepted { upgraded_hash: Option<String> },
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {}", e)))
}

pub fn is_hashed(stored: &str) -> bool {
    stored.starts_with("$argon2")
}

pub fn verify_credential(stored: Option<&str>, presented: &str) -> AppResult<CredentialCheck> {
    let Some(stored) = stored.filter(|s| !s.is_empty()) else {
        return Ok(CredentialCheck::Rejected);
    };

    if is_hashed(stored) {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| AppError::InternalError(format!("Stored credential is corrupt: {}", e)))?;

        return Ok(
            match Argon2::default().verify_password(presented.as_bytes(), &parsed) {
                Ok(()) => CredentialCheck::Accepted {
                    upgraded_hash: None,
                },
                Err(_) => CredentialCheck::Rejected,
            },
        );
    }

    // Legacy plaintext: compare fixed-length digests
    if Sha256::digest(stored.as_bytes()) != Sha256::digest(presented.as_bytes()) {
        return Ok(CredentialCheck::Rejected);
    }

    Ok(CredentialCheck::Accepted {
        upgraded_hash: Some(hash_password(presented)?),
    })
}
