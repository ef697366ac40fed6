use std::{sync::Arc, time::Duration};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use quizwarden_server::{
    app_state::AppState, config::Config, handlers, middleware::RequestIdMiddleware,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    config.validate_for_production();

    let host = config.web_server_host.clone();
    let port = config.web_server_port;
    let scheduler_interval = Duration::from_secs(config.scheduler_interval_secs);

    let state = AppState::new(config)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to initialize application: {}", e)))?;
    let state = Arc::new(state);

    state.publish_scheduler.clone().start(scheduler_interval).await;

    log::info!("Starting HTTP server on {}:{}", host, port);

    let app_state = web::Data::new(state.clone());
    let jwt_service = web::Data::from(state.jwt_service.clone());

    let result = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(jwt_service.clone())
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .wrap(RequestIdMiddleware)
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await;

    state.publish_scheduler.stop().await;
    result
}
