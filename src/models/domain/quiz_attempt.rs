use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Timeout,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Timeout => "timeout",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub attempt_number: i32,
    pub answers: Vec<AttemptAnswer>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub total_marks: i32,
    pub score: i32,
    pub percentage: f64,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<i64>, // seconds
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttemptAnswer {
    pub question_id: String,
    pub response: String,
    pub is_correct: bool,
    pub marks_obtained: i32,
}

/// Everything written when an attempt leaves `in_progress`. Applied once.
#[derive(Clone, Debug, PartialEq)]
pub enum Finalization {
    Completed {
        answers: Vec<AttemptAnswer>,
        score: i32,
        total_marks: i32,
        percentage: f64,
        end_time: DateTime<Utc>,
        time_taken: i64,
    },
    TimedOut {
        end_time: DateTime<Utc>,
        time_taken: i64,
    },
}

impl Finalization {
    pub fn status(&self) -> AttemptStatus {
        match self {
            Finalization::Completed { .. } => AttemptStatus::Completed,
            Finalization::TimedOut { .. } => AttemptStatus::Timeout,
        }
    }
}

impl QuizAttempt {
    pub fn start(user_id: &str, quiz_id: &str, attempt_number: i32, now: DateTime<Utc>) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            quiz_id: quiz_id.to_string(),
            attempt_number,
            answers: Vec::new(),
            start_time: now,
            end_time: None,
            total_marks: 0,
            score: 0,
            percentage: 0.0,
            status: AttemptStatus::InProgress,
            time_taken: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whole seconds between start and `end_time`, never negative.
    pub fn seconds_until(&self, end_time: DateTime<Utc>) -> i64 {
        (end_time - self.start_time).num_seconds().max(0)
    }

    pub fn timed_out_at(&self, end_time: DateTime<Utc>) -> Finalization {
        Finalization::TimedOut {
            end_time,
            time_taken: self.seconds_until(end_time),
        }
    }

    /// Applies a terminal transition in memory. Returns false if already terminal.
    pub fn apply(&mut self, finalization: &Finalization) -> bool {
        if self.is_terminal() {
            return false;
        }

        self.status = finalization.status();
        match finalization {
            Finalization::Completed {
                answers,
                score,
                total_marks,
                percentage,
                end_time,
                time_taken,
            } => {
                self.answers = answers.clone();
                self.score = *score;
                self.total_marks = *total_marks;
                self.percentage = *percentage;
                self.end_time = Some(*end_time);
                self.time_taken = Some(*time_taken);
            }
            Finalization::TimedOut {
                end_time,
                time_taken,
            } => {
                self.end_time = Some(*end_time);
                self.time_taken = Some(*time_taken);
            }
        }
        true
    }
}
