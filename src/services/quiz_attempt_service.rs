use std::sync::Arc;

use validator::Validate;

use crate::{
    auth::{attempt_viewer, Claims},
    clock::Clock,
    errors::{AppError, AppResult, ForbiddenReason},
    models::{
        domain::{Finalization, Quiz, QuizAttempt},
        dto::{
            request::SubmitAttemptRequest,
            response::{AttemptResult, StartAttemptResponse, TimeoutAck},
            views::{AttemptView, QuizView},
        },
    },
    repositories::{QuizAttemptRepository, QuizRepository},
    services::{access_gate_service::AccessGateService, scoring},
};

/// Owns the attempt state machine: `in_progress` → `completed` | `timeout`.
/// Terminal writes go through the repository's conditional `finalize`, so
/// racing submits and timeouts produce exactly one terminal record.
pub struct QuizAttemptService {
    quiz_repository: Arc<dyn QuizRepository>,
    attempt_repository: Arc<dyn QuizAttemptRepository>,
    access_gate: Arc<AccessGateService>,
    clock: Arc<dyn Clock>,
}

impl QuizAttemptService {
    pub fn new(
        quiz_repository: Arc<dyn QuizRepository>,
        attempt_repository: Arc<dyn QuizAttemptRepository>,
        access_gate: Arc<AccessGateService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            quiz_repository,
            attempt_repository,
            access_gate,
            clock,
        }
    }

    /// Starts a new attempt, or resumes the caller's in-progress one.
    pub async fn start_attempt(
        &self,
        quiz_id: &str,
        user_id: &str,
        access_token: Option<&str>,
    ) -> AppResult<StartAttemptResponse> {
        let now = self.clock.now();
        let quiz = self.load_quiz(quiz_id).await?;

        quiz.check_available(now).map_err(|reason| {
            log::debug!("Start rejected for quiz {}: {}", quiz_id, reason);
            AppError::Forbidden(reason)
        })?;

        if quiz.is_password_protected() && !self.access_gate.check_token(access_token, &quiz.id, user_id) {
            return Err(AppError::Forbidden(ForbiddenReason::RequiresPassword));
        }

        let completed = self
            .attempt_repository
            .count_completed(user_id, &quiz.id)
            .await?;
        if completed >= quiz.max_attempts.max(0) as usize {
            return Err(AppError::Forbidden(ForbiddenReason::MaxAttemptsReached));
        }

        if let Some(existing) = self.attempt_repository.find_in_progress(user_id, &quiz.id).await? {
            log::info!("Resuming attempt {} for user {}", existing.id, user_id);
            return Ok(Self::started(existing, &quiz, true));
        }

        // The repository re-checks the cap and renumbers under its own write guard.
        let attempt = QuizAttempt::start(user_id, &quiz.id, completed as i32 + 1, now);
        match self
            .attempt_repository
            .create_in_progress(attempt, quiz.max_attempts)
            .await
        {
            Ok(created) => {
                log::info!(
                    "Started attempt {} (#{}) on quiz {} for user {}",
                    created.id,
                    created.attempt_number,
                    quiz.id,
                    user_id
                );
                Ok(Self::started(created, &quiz, false))
            }
            // A concurrent start won the unique slot; hand back its attempt.
            Err(AppError::AlreadyExists(_)) => self
                .attempt_repository
                .find_in_progress(user_id, &quiz.id)
                .await?
                .map(|existing| Self::started(existing, &quiz, true))
                .ok_or_else(|| {
                    AppError::InvalidState("Attempt changed state while starting; retry".to_string())
                }),
            Err(e) => Err(e),
        }
    }

    /// Grades and closes an attempt. Replays on a closed attempt return the
    /// stored result; submissions after the time limit close it as `timeout`
    /// and discard the answers.
    pub async fn submit_attempt(
        &self,
        attempt_id: &str,
        user_id: &str,
        request: SubmitAttemptRequest,
    ) -> AppResult<AttemptResult> {
        self.submit_with(attempt_id, user_id, move || Ok(request)).await
    }

    /// `submit_attempt` for a raw JSON body. The body is only decoded once the
    /// attempt is known to be open and inside its time limit, so replays and
    /// late submits never fail on the payload.
    pub async fn submit_attempt_json(
        &self,
        attempt_id: &str,
        user_id: &str,
        body: &[u8],
    ) -> AppResult<AttemptResult> {
        self.submit_with(attempt_id, user_id, || {
            serde_json::from_slice(body)
                .map_err(|e| AppError::ValidationError(format!("Json deserialize error: {}", e)))
        })
        .await
    }

    async fn submit_with<F>(&self, attempt_id: &str, user_id: &str, decode: F) -> AppResult<AttemptResult>
    where
        F: FnOnce() -> AppResult<SubmitAttemptRequest>,
    {
        let attempt = self.load_attempt(attempt_id).await?;
        if attempt.user_id != user_id {
            return Err(AppError::Forbidden(ForbiddenReason::NotOwner));
        }

        let quiz = self.quiz_repository.find_by_id(&attempt.quiz_id).await?;
        if attempt.is_terminal() {
            return Ok(match &quiz {
                Some(quiz) => AttemptResult::from_attempt(&attempt, quiz),
                None => AttemptResult::without_quiz(&attempt),
            });
        }
        let quiz = quiz.ok_or_else(|| Self::quiz_not_found(&attempt.quiz_id))?;

        let now = self.clock.now();
        if quiz.is_overdue(attempt.start_time, now) {
            let stored = self
                .finalize_or_reload(&attempt.id, &attempt.timed_out_at(now))
                .await?;
            log::info!("Late submit on attempt {}; closed as {}", attempt.id, stored.status);
            return Ok(AttemptResult::from_attempt(&stored, &quiz));
        }

        let request = decode()?;
        request.validate()?;

        let graded = scoring::grade_submission(&quiz.questions, &request.answers);
        let finalization = Finalization::Completed {
            answers: graded.answers,
            score: graded.score,
            total_marks: graded.total_marks,
            percentage: graded.percentage,
            end_time: now,
            time_taken: attempt.seconds_until(now),
        };

        let stored = self.finalize_or_reload(&attempt.id, &finalization).await?;
        log::info!(
            "Attempt {} closed as {} with {}/{}",
            stored.id,
            stored.status,
            stored.score,
            stored.total_marks
        );
        Ok(AttemptResult::from_attempt(&stored, &quiz))
    }

    /// Client-reported expiry. Idempotent; never grades.
    pub async fn timeout_attempt(&self, attempt_id: &str, user_id: &str) -> AppResult<TimeoutAck> {
        let attempt = self.load_attempt(attempt_id).await?;
        if attempt.user_id != user_id {
            return Err(AppError::Forbidden(ForbiddenReason::NotOwner));
        }

        let stored = if attempt.is_terminal() {
            attempt
        } else {
            let now = self.clock.now();
            let stored = self
                .finalize_or_reload(&attempt.id, &attempt.timed_out_at(now))
                .await?;
            log::info!("Attempt {} reported expired; now {}", stored.id, stored.status);
            stored
        };

        Ok(TimeoutAck {
            attempt_id: stored.id,
            status: stored.status,
        })
    }

    pub async fn get_attempt(&self, attempt_id: &str, requester: &Claims) -> AppResult<AttemptView> {
        let attempt = self.load_attempt(attempt_id).await?;
        let quiz = self.load_quiz(&attempt.quiz_id).await?;

        let viewer = attempt_viewer(requester, &attempt, &quiz)
            .ok_or(AppError::Forbidden(ForbiddenReason::NotOwner))?;

        Ok(AttemptView::project(&attempt, &quiz, viewer))
    }

    pub async fn list_attempts(&self, quiz_id: &str, user_id: &str) -> AppResult<Vec<AttemptResult>> {
        let quiz = self.load_quiz(quiz_id).await?;
        let attempts = self
            .attempt_repository
            .find_by_user_and_quiz(user_id, quiz_id)
            .await?;

        Ok(attempts
            .iter()
            .map(|attempt| AttemptResult::from_attempt(attempt, &quiz))
            .collect())
    }

    fn started(attempt: QuizAttempt, quiz: &Quiz, resumed: bool) -> StartAttemptResponse {
        StartAttemptResponse {
            expires_at: quiz.expires_at(attempt.start_time),
            quiz: QuizView::project(quiz, false),
            attempt,
            resumed,
        }
    }

    async fn finalize_or_reload(&self, attempt_id: &str, finalization: &Finalization) -> AppResult<QuizAttempt> {
        if let Some(updated) = self
            .attempt_repository
            .finalize(attempt_id, finalization)
            .await?
        {
            return Ok(updated);
        }

        // Lost the race: whoever won has already written the terminal state.
        let current = self.load_attempt(attempt_id).await?;
        if current.is_terminal() {
            Ok(current)
        } else {
            Err(AppError::InvalidState(format!(
                "Attempt '{}' could not be closed from state {}",
                attempt_id, current.status
            )))
        }
    }

    async fn load_quiz(&self, quiz_id: &str) -> AppResult<Quiz> {
        self.quiz_repository
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| Self::quiz_not_found(quiz_id))
    }

    fn quiz_not_found(quiz_id: &str) -> AppError {
        AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id))
    }

    async fn load_attempt(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        self.attempt_repository
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id)))
    }
}
