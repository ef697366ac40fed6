use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::{is_duplicate_key_error, Database},
    errors::{AppError, AppResult, ForbiddenReason},
    models::domain::{AttemptStatus, Finalization, QuizAttempt},
};

#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Stores a new in-progress attempt numbered from the completed count at
    /// write time. Fails with `AlreadyExists` if the user already has an
    /// in-progress attempt on the quiz, and with
    /// `Forbidden(MaxAttemptsReached)` once `max_attempts` are completed.
    async fn create_in_progress(&self, attempt: QuizAttempt, max_attempts: i32) -> AppResult<QuizAttempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>>;
    async fn find_in_progress(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizAttempt>>;
    async fn count_completed(&self, user_id: &str, quiz_id: &str) -> AppResult<usize>;
    /// Newest first.
    async fn find_by_user_and_quiz(&self, user_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>>;
    /// Applies the terminal transition only if the attempt is still
    /// in progress at write time. `None` means another writer won.
    async fn finalize(&self, id: &str, finalization: &Finalization) -> AppResult<Option<QuizAttempt>>;
}

pub struct MongoQuizAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_quiz_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "quiz_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_quiz".to_string())
                    .build(),
            )
            .build();

        // At most one in-progress attempt per (user, quiz)
        let active_attempt_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "quiz_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_quiz_in_progress_unique".to_string())
                    .partial_filter_expression(doc! { "status": AttemptStatus::InProgress.as_str() })
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_quiz_index).await?;
        self.collection.create_index(active_attempt_index).await?;

        log::info!("Successfully created indexes for quiz_attempts collection");
        Ok(())
    }
}

fn finalization_update(finalization: &Finalization) -> AppResult<Document> {
    let mut set = doc! { "status": finalization.status().as_str() };

    match finalization {
        Finalization::Completed {
            answers,
            score,
            total_marks,
            percentage,
            end_time,
            time_taken,
        } => {
            set.insert("answers", to_bson(answers)?);
            set.insert("score", *score);
            set.insert("total_marks", *total_marks);
            set.insert("percentage", *percentage);
            set.insert("end_time", to_bson(end_time)?);
            set.insert("time_taken", *time_taken);
        }
        Finalization::TimedOut {
            end_time,
            time_taken,
        } => {
            set.insert("end_time", to_bson(end_time)?);
            set.insert("time_taken", *time_taken);
        }
    }

    Ok(doc! { "$set": set })
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn create_in_progress(&self, mut attempt: QuizAttempt, max_attempts: i32) -> AppResult<QuizAttempt> {
        let cap = max_attempts.max(0) as usize;

        let before = self.count_completed(&attempt.user_id, &attempt.quiz_id).await?;
        if before >= cap {
            return Err(AppError::Forbidden(ForbiddenReason::MaxAttemptsReached));
        }
        attempt.attempt_number = before as i32 + 1;

        match self.collection.insert_one(&attempt).await {
            Ok(_) => {}
            Err(err) if is_duplicate_key_error(&err) => {
                return Err(AppError::AlreadyExists(format!(
                    "User '{}' already has an attempt in progress on quiz '{}'",
                    attempt.user_id, attempt.quiz_id
                )))
            }
            Err(err) => return Err(err.into()),
        }

        // The new attempt now holds the user's only in-progress slot, so the
        // completed count is settled; reconcile against it.
        let after = self.count_completed(&attempt.user_id, &attempt.quiz_id).await?;
        if after >= cap {
            self.collection
                .delete_one(doc! { "id": &attempt.id, "status": AttemptStatus::InProgress.as_str() })
                .await?;
            log::debug!(
                "Withdrew attempt {}: cap reached while it was being created",
                attempt.id
            );
            return Err(AppError::Forbidden(ForbiddenReason::MaxAttemptsReached));
        }
        if after != before {
            attempt.attempt_number = after as i32 + 1;
            self.collection
                .update_one(
                    doc! { "id": &attempt.id },
                    doc! { "$set": { "attempt_number": attempt.attempt_number } },
                )
                .await?;
        }

        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_in_progress(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id,
                "status": AttemptStatus::InProgress.as_str()
            })
            .await?;
        Ok(attempt)
    }

    async fn count_completed(&self, user_id: &str, quiz_id: &str) -> AppResult<usize> {
        let count = self
            .collection
            .count_documents(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id,
                "status": AttemptStatus::Completed.as_str()
            })
            .await?;
        Ok(count as usize)
    }

    // start_time is stored in its serde string form; order on the parsed value.
    async fn find_by_user_and_quiz(&self, user_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let mut attempts: Vec<QuizAttempt> = self
            .collection
            .find(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id
            })
            .await?
            .try_collect()
            .await?;
        attempts.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(attempts)
    }

    async fn finalize(&self, id: &str, finalization: &Finalization) -> AppResult<Option<QuizAttempt>> {
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "id": id, "status": AttemptStatus::InProgress.as_str() },
                finalization_update(finalization)?,
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn timeout_update_sets_only_status_and_timing() {
        let now = Utc::now();
        let update = finalization_update(&Finalization::TimedOut {
            end_time: now,
            time_taken: 42,
        })
        .unwrap();

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "timeout");
        assert_eq!(set.get_i64("time_taken").unwrap(), 42);
        assert!(set.get("answers").is_none());
        assert!(set.get("score").is_none());
    }

    #[test]
    fn completion_update_writes_all_graded_fields() {
        let update = finalization_update(&Finalization::Completed {
            answers: vec![],
            score: 15,
            total_marks: 15,
            percentage: 100.0,
            end_time: Utc::now(),
            time_taken: 60,
        })
        .unwrap();

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "completed");
        assert_eq!(set.get_i32("score").unwrap(), 15);
        assert_eq!(set.get_f64("percentage").unwrap(), 100.0);
        assert!(set.get_array("answers").unwrap().is_empty());
    }
}
