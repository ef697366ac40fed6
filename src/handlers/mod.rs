use actix_web::web;

use crate::{auth::AuthMiddleware, errors::AppError};

pub mod attempt_handler;
pub mod health_handler;
pub mod quiz_handler;

pub use attempt_handler::{get_attempt, submit_attempt, timeout_attempt};
pub use health_handler::health_check;
pub use quiz_handler::{list_my_attempts, start_attempt, verify_quiz_password};

/// Registers every route. Everything under `/api` requires a session token.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check).service(
        web::scope("/api")
            .wrap(AuthMiddleware)
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::ValidationError(err.to_string()).into()
            }))
            .service(verify_quiz_password)
            .service(start_attempt)
            .service(list_my_attempts)
            .service(submit_attempt)
            .service(timeout_attempt)
            .service(get_attempt),
    );
}
