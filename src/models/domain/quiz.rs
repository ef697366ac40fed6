use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ForbiddenReason, models::domain::quiz_question::QuizQuestion};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub created_by: String, // lecturer user id
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub max_attempts: i32,
    pub passing_score: i32, // percentage, 0-100
    pub questions: Vec<QuizQuestion>,
    pub has_password: bool,
    // Argon2 PHC string, or a legacy plaintext value awaiting upgrade
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_credential: Option<String>,
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_publish: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub allow_review: bool,
    pub show_correct_answers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn new(
        created_by: &str,
        title: &str,
        duration_minutes: i64,
        max_attempts: i32,
        passing_score: i32,
        questions: Vec<QuizQuestion>,
    ) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            created_by: created_by.to_string(),
            title: title.to_string(),
            description: None,
            duration_minutes,
            max_attempts,
            passing_score,
            questions,
            has_password: false,
            password_credential: None,
            is_published: false,
            scheduled_publish: None,
            deadline: None,
            allow_review: true,
            show_correct_answers: false,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn total_marks(&self) -> i32 {
        self.questions.iter().map(|q| q.marks).sum()
    }

    /// `None` when the duration is too large to represent, i.e. unbounded.
    pub fn time_limit(&self) -> Option<Duration> {
        Duration::try_minutes(self.duration_minutes)
    }

    /// End of the time window for an attempt started at `start_time`.
    pub fn expires_at(&self, start_time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.time_limit()
            .and_then(|limit| start_time.checked_add_signed(limit))
    }

    /// Strictly past the time limit; the limit instant itself is still in time.
    pub fn is_overdue(&self, start_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.expires_at(start_time).is_some_and(|end| now > end)
    }

    /// Checks the publish window, the publish flag, in that order.
    pub fn check_available(&self, now: DateTime<Utc>) -> Result<(), ForbiddenReason> {
        if self.scheduled_publish.is_some_and(|at| now < at) {
            return Err(ForbiddenReason::NotYetAvailable);
        }
        if self.deadline.is_some_and(|at| now > at) {
            return Err(ForbiddenReason::DeadlinePassed);
        }
        if !self.is_published {
            return Err(ForbiddenReason::NotPublished);
        }
        Ok(())
    }

    pub fn is_password_protected(&self) -> bool {
        self.has_password
    }

    pub fn is_due_for_publish(&self, now: DateTime<Utc>) -> bool {
        !self.is_published
            && self.scheduled_publish.is_some_and(|at| at <= now)
            && !self.deadline.is_some_and(|at| at < now)
    }

    pub fn is_due_for_unpublish(&self, now: DateTime<Utc>) -> bool {
        self.is_published && self.deadline.is_some_and(|at| at < now)
    }
}
