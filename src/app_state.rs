use std::sync::Arc;

use crate::{
    auth::JwtService,
    clock::{Clock, SystemClock},
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoQuizAttemptRepository, MongoQuizRepository, QuizAttemptRepository, QuizRepository,
    },
    services::{AccessGateService, PublishScheduler, QuizAttemptService},
};

#[derive(Clone)]
pub struct AppState {
    pub access_gate: Arc<AccessGateService>,
    pub attempt_service: Arc<QuizAttemptService>,
    pub publish_scheduler: Arc<PublishScheduler>,
    pub jwt_service: Arc<JwtService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let quiz_repository = Arc::new(MongoQuizRepository::new(&db, &config.quizzes_collection));
        quiz_repository.ensure_indexes().await?;

        let attempt_repository = Arc::new(MongoQuizAttemptRepository::new(
            &db,
            &config.attempts_collection,
        ));
        attempt_repository.ensure_indexes().await?;

        Ok(Self::with_repositories(
            config,
            quiz_repository,
            attempt_repository,
            Arc::new(SystemClock),
        ))
    }

    pub fn with_repositories(
        config: Config,
        quiz_repository: Arc<dyn QuizRepository>,
        attempt_repository: Arc<dyn QuizAttemptRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
        ));

        let access_gate = Arc::new(AccessGateService::new(
            quiz_repository.clone(),
            jwt_service.clone(),
            clock.clone(),
            chrono::Duration::minutes(config.quiz_access_token_minutes),
        ));

        let attempt_service = Arc::new(QuizAttemptService::new(
            quiz_repository.clone(),
            attempt_repository,
            access_gate.clone(),
            clock.clone(),
        ));

        let publish_scheduler = Arc::new(PublishScheduler::new(quiz_repository, clock));

        Self {
            access_gate,
            attempt_service,
            publish_scheduler,
            jwt_service,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        repositories::{InMemoryQuizAttemptRepository, InMemoryQuizRepository},
    };

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn access_token_ttl_follows_config() {
        let mut config = Config::test_config();
        config.quiz_access_token_minutes = 5;

        let state = AppState::with_repositories(
            config,
            Arc::new(InMemoryQuizRepository::new()),
            Arc::new(InMemoryQuizAttemptRepository::new()),
            Arc::new(ManualClock::new(chrono::Utc::now())),
        );

        let token = state.access_gate.issue_token("student-1", "quiz-1").unwrap();
        assert!(state.access_gate.check_token(Some(&token), "quiz-1", "student-1"));
    }
}
