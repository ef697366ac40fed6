//! In-process repositories with the same atomicity guarantees as the MongoDB
//! ones: every check-and-write runs under a single write lock.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult, ForbiddenReason},
    models::domain::{AttemptStatus, Finalization, Quiz, QuizAttempt},
    repositories::{QuizAttemptRepository, QuizRepository},
};

#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: Arc<RwLock<HashMap<String, Quiz>>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, quiz: Quiz) {
        self.quizzes.write().await.insert(quiz.id.clone(), quiz);
    }

    pub async fn remove(&self, id: &str) -> Option<Quiz> {
        self.quizzes.write().await.remove(id)
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn find_due_for_publish(&self, now: DateTime<Utc>) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes
            .values()
            .filter(|q| q.is_due_for_publish(now))
            .cloned()
            .collect())
    }

    async fn find_due_for_unpublish(&self, now: DateTime<Utc>) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes
            .values()
            .filter(|q| q.is_due_for_unpublish(now))
            .cloned()
            .collect())
    }

    async fn set_published(&self, id: &str, published: bool, now: DateTime<Utc>) -> AppResult<bool> {
        let mut quizzes = self.quizzes.write().await;
        let quiz = quizzes
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))?;

        if quiz.is_published == published {
            return Ok(false);
        }
        quiz.is_published = published;
        quiz.modified_at = Some(now);
        Ok(true)
    }

    async fn update_password_credential(
        &self,
        id: &str,
        credential: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut quizzes = self.quizzes.write().await;
        let quiz = quizzes
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))?;

        quiz.password_credential = Some(credential.to_string());
        quiz.modified_at = Some(now);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizAttemptRepository {
    attempts: Arc<RwLock<HashMap<String, QuizAttempt>>>,
}

impl InMemoryQuizAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<QuizAttempt> {
        self.attempts.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn create_in_progress(&self, mut attempt: QuizAttempt, max_attempts: i32) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;

        let mut active = false;
        let mut completed = 0usize;
        for existing in attempts
            .values()
            .filter(|a| a.user_id == attempt.user_id && a.quiz_id == attempt.quiz_id)
        {
            match existing.status {
                AttemptStatus::InProgress => active = true,
                AttemptStatus::Completed => completed += 1,
                AttemptStatus::Timeout => {}
            }
        }

        if active || attempts.contains_key(&attempt.id) {
            return Err(AppError::AlreadyExists(format!(
                "User '{}' already has an attempt in progress on quiz '{}'",
                attempt.user_id, attempt.quiz_id
            )));
        }

        if completed >= max_attempts.max(0) as usize {
            return Err(AppError::Forbidden(ForbiddenReason::MaxAttemptsReached));
        }

        attempt.attempt_number = completed as i32 + 1;
        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        Ok(self.attempts.read().await.get(id).cloned())
    }

    async fn find_in_progress(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .find(|a| {
                a.user_id == user_id && a.quiz_id == quiz_id && a.status == AttemptStatus::InProgress
            })
            .cloned())
    }

    async fn count_completed(&self, user_id: &str, quiz_id: &str) -> AppResult<usize> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .filter(|a| {
                a.user_id == user_id && a.quiz_id == quiz_id && a.status == AttemptStatus::Completed
            })
            .count())
    }

    async fn find_by_user_and_quiz(&self, user_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        let mut items: Vec<_> = attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(items)
    }

    async fn finalize(&self, id: &str, finalization: &Finalization) -> AppResult<Option<QuizAttempt>> {
        let mut attempts = self.attempts.write().await;
        match attempts.get_mut(id) {
            Some(attempt) => Ok(attempt.apply(finalization).then(|| attempt.clone())),
            None => Ok(None),
        }
    }
}
