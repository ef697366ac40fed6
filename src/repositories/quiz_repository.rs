use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{db::Database, errors::AppResult, models::domain::Quiz};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;
    async fn find_due_for_publish(&self, now: DateTime<Utc>) -> AppResult<Vec<Quiz>>;
    async fn find_due_for_unpublish(&self, now: DateTime<Utc>) -> AppResult<Vec<Quiz>>;
    /// Returns false when the flag already had the requested value.
    async fn set_published(&self, id: &str, published: bool, now: DateTime<Utc>) -> AppResult<bool>;
    async fn update_password_credential(
        &self,
        id: &str,
        credential: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let publish_index = IndexModel::builder()
            .keys(doc! { "is_published": 1 })
            .options(
                IndexOptions::builder()
                    .name("is_published".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(publish_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }

    async fn find_candidates(&self, filter: Document) -> AppResult<Vec<Quiz>> {
        let cursor = self.collection.find(filter).await?;
        let items: Vec<Quiz> = cursor.try_collect().await?;
        Ok(items)
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    // Timestamps are stored in their serde form, so the time comparison runs here.
    async fn find_due_for_publish(&self, now: DateTime<Utc>) -> AppResult<Vec<Quiz>> {
        let candidates = self
            .find_candidates(doc! {
                "is_published": false,
                "scheduled_publish": { "$ne": null }
            })
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|quiz| quiz.is_due_for_publish(now))
            .collect())
    }

    async fn find_due_for_unpublish(&self, now: DateTime<Utc>) -> AppResult<Vec<Quiz>> {
        let candidates = self
            .find_candidates(doc! {
                "is_published": true,
                "deadline": { "$ne": null }
            })
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|quiz| quiz.is_due_for_unpublish(now))
            .collect())
    }

    async fn set_published(&self, id: &str, published: bool, now: DateTime<Utc>) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id, "is_published": !published },
                doc! {
                    "$set": {
                        "is_published": published,
                        "modified_at": to_bson(&now)?,
                    }
                },
            )
            .await?;

        Ok(result.modified_count > 0)
    }

    async fn update_password_credential(
        &self,
        id: &str,
        credential: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "id": id },
                doc! {
                    "$set": {
                        "password_credential": credential,
                        "modified_at": to_bson(&now)?,
                    }
                },
            )
            .await?;

        Ok(())
    }
}
