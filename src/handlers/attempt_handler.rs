use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};

use crate::{app_state::AppState, auth::AuthenticatedUser, errors::AppError};

#[post("/attempts/{attempt_id}/submit")]
pub async fn submit_attempt(
    state: web::Data<Arc<AppState>>,
    attempt_id: web::Path<String>,
    body: web::Bytes,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    // Decoded by the service, after the replay and deadline checks
    let result = state
        .attempt_service
        .submit_attempt_json(&attempt_id, &auth.0.sub, &body)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/attempts/{attempt_id}/timeout")]
pub async fn timeout_attempt(
    state: web::Data<Arc<AppState>>,
    attempt_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let ack = state
        .attempt_service
        .timeout_attempt(&attempt_id, &auth.0.sub)
        .await?;
    Ok(HttpResponse::Ok().json(ack))
}

#[get("/attempts/{attempt_id}")]
pub async fn get_attempt(
    state: web::Data<Arc<AppState>>,
    attempt_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let view = state
        .attempt_service
        .get_attempt(&attempt_id, &auth.0)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}
