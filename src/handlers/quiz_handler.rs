use std::sync::Arc;

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::QuizAccessRequest,
};

pub const QUIZ_ACCESS_TOKEN_HEADER: &str = "X-Quiz-Access-Token";

#[post("/quizzes/{quiz_id}/access")]
pub async fn verify_quiz_password(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    request: web::Json<QuizAccessRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let response = state
        .access_gate
        .verify_quiz_password(&quiz_id, &auth.0.sub, &request.password)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/quizzes/{quiz_id}/attempts")]
pub async fn start_attempt(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    req: HttpRequest,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let access_token = req
        .headers()
        .get(QUIZ_ACCESS_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());

    let response = state
        .attempt_service
        .start_attempt(&quiz_id, &auth.0.sub, access_token)
        .await?;

    if response.resumed {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::Created().json(response))
    }
}

#[get("/quizzes/{quiz_id}/attempts/me")]
pub async fn list_my_attempts(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempts = state
        .attempt_service
        .list_attempts(&quiz_id, &auth.0.sub)
        .await?;
    Ok(HttpResponse::Ok().json(attempts))
}
