use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{clock::Clock, repositories::QuizRepository};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub published: usize,
    pub unpublished: usize,
    pub failed: usize,
    /// The previous tick was still running.
    pub skipped: bool,
}

impl TickReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        self.published == 0 && self.unpublished == 0 && self.failed == 0
    }
}

/// Periodically flips `is_published` on quizzes whose `scheduled_publish`
/// has arrived or whose `deadline` has passed.
pub struct PublishScheduler {
    quiz_repository: Arc<dyn QuizRepository>,
    clock: Arc<dyn Clock>,
    tick_lock: Mutex<()>,
    worker_handle: RwLock<Option<JoinHandle<()>>>,
}

impl PublishScheduler {
    pub fn new(quiz_repository: Arc<dyn QuizRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            quiz_repository,
            clock,
            tick_lock: Mutex::new(()),
            worker_handle: RwLock::new(None),
        }
    }

    /// Runs one publish sweep followed by one unpublish sweep. A failure on
    /// one quiz is logged and counted; the rest of the sweep continues.
    pub async fn tick(&self) -> TickReport {
        let Ok(_guard) = self.tick_lock.try_lock() else {
            log::warn!("Previous publish scheduler tick still running, skipping");
            return TickReport::skipped();
        };

        let now = self.clock.now();
        let mut report = TickReport::default();
        self.sweep(true, now, &mut report).await;
        self.sweep(false, now, &mut report).await;
        report
    }

    async fn sweep(&self, publish: bool, now: DateTime<Utc>, report: &mut TickReport) {
        let action = if publish { "publish" } else { "unpublish" };

        let due = if publish {
            self.quiz_repository.find_due_for_publish(now).await
        } else {
            self.quiz_repository.find_due_for_unpublish(now).await
        };
        let quizzes = match due {
            Ok(quizzes) => quizzes,
            Err(e) => {
                log::error!("Failed to query quizzes due to {}: {}", action, e);
                report.failed += 1;
                return;
            }
        };

        for quiz in quizzes {
            match self.quiz_repository.set_published(&quiz.id, publish, now).await {
                Ok(true) => {
                    log::info!("Scheduled {} applied to quiz {} ({})", action, quiz.id, quiz.title);
                    if publish {
                        report.published += 1;
                    } else {
                        report.unpublished += 1;
                    }
                }
                Ok(false) => log::debug!("Quiz {} already in target state for {}", quiz.id, action),
                Err(e) => {
                    log::error!("Failed to {} quiz {}: {}", action, quiz.id, e);
                    report.failed += 1;
                }
            }
        }
    }

    /// Spawns the background loop. Replaces a loop that is already running.
    pub async fn start(self: Arc<Self>, interval: std::time::Duration) {
        let scheduler = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let report = scheduler.tick().await;
                if !report.is_idle() {
                    log::info!(
                        "Publish scheduler tick: {} published, {} unpublished, {} failed",
                        report.published,
                        report.unpublished,
                        report.failed
                    );
                }
            }
        });

        log::info!("Publish scheduler started (every {:?})", interval);
        let mut worker = self.worker_handle.write().await;
        if let Some(previous) = worker.replace(handle) {
            previous.abort();
        }
    }

    pub async fn stop(&self) {
        let mut worker = self.worker_handle.write().await;
        if let Some(handle) = worker.take() {
            handle.abort();
            log::info!("Publish scheduler stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.worker_handle.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        errors::AppError,
        models::domain::Quiz,
        repositories::{InMemoryQuizRepository, MockQuizRepository},
    };
    use chrono::Duration;

    fn quiz(title: &str) -> Quiz {
        Quiz::new("lecturer-1", title, 10, 1, 50, vec![])
    }

    #[tokio::test]
    async fn publishes_and_unpublishes_due_quizzes() {
        let now = Utc::now();
        let repo = Arc::new(InMemoryQuizRepository::new());

        let mut due = quiz("due");
        due.scheduled_publish = Some(now - Duration::minutes(1));
        let due_id = due.id.clone();

        let mut future = quiz("future");
        future.scheduled_publish = Some(now + Duration::hours(1));
        let future_id = future.id.clone();

        let mut expired = quiz("expired");
        expired.is_published = true;
        expired.deadline = Some(now - Duration::seconds(1));
        let expired_id = expired.id.clone();

        for q in [due, future, expired] {
            repo.insert(q).await;
        }

        let scheduler = PublishScheduler::new(repo.clone(), Arc::new(ManualClock::new(now)));
        let report = scheduler.tick().await;

        assert_eq!(report.published, 1);
        assert_eq!(report.unpublished, 1);
        assert_eq!(report.failed, 0);
        assert!(repo.find_by_id(&due_id).await.unwrap().unwrap().is_published);
        assert!(!repo.find_by_id(&future_id).await.unwrap().unwrap().is_published);
        assert!(!repo.find_by_id(&expired_id).await.unwrap().unwrap().is_published);

        // Nothing left to do
        assert!(scheduler.tick().await.is_idle());
    }

    #[tokio::test]
    async fn flag_change_is_stamped_with_the_scheduler_clock() {
        let now = Utc::now() - Duration::days(3);
        let repo = Arc::new(InMemoryQuizRepository::new());

        let mut due = quiz("due");
        due.scheduled_publish = Some(now - Duration::minutes(1));
        let due_id = due.id.clone();
        repo.insert(due).await;

        let scheduler = PublishScheduler::new(repo.clone(), Arc::new(ManualClock::new(now)));
        assert_eq!(scheduler.tick().await.published, 1);

        let stored = repo.find_by_id(&due_id).await.unwrap().unwrap();
        assert_eq!(stored.modified_at, Some(now));
    }

    #[tokio::test]
    async fn scheduled_quiz_past_its_deadline_is_not_published() {
        let now = Utc::now();
        let repo = Arc::new(InMemoryQuizRepository::new());

        let mut missed = quiz("missed");
        missed.scheduled_publish = Some(now - Duration::hours(2));
        missed.deadline = Some(now - Duration::hours(1));
        let missed_id = missed.id.clone();
        repo.insert(missed).await;

        let scheduler = PublishScheduler::new(repo.clone(), Arc::new(ManualClock::new(now)));
        let report = scheduler.tick().await;

        assert!(report.is_idle());
        assert!(!repo.find_by_id(&missed_id).await.unwrap().unwrap().is_published);
    }

    #[tokio::test]
    async fn one_failing_quiz_does_not_stop_the_sweep() {
        let mut first = quiz("first");
        first.id = "quiz-1".to_string();
        let mut second = quiz("second");
        second.id = "quiz-2".to_string();

        let mut mock = MockQuizRepository::new();
        mock.expect_find_due_for_publish()
            .times(1)
            .returning(move |_| Ok(vec![first.clone(), second.clone()]));
        mock.expect_find_due_for_unpublish()
            .times(1)
            .returning(|_| Err(AppError::DatabaseError("connection reset".to_string())));
        mock.expect_set_published()
            .withf(|id, published, _| id == "quiz-1" && *published)
            .times(1)
            .returning(|_, _, _| Err(AppError::DatabaseError("write conflict".to_string())));
        mock.expect_set_published()
            .withf(|id, published, _| id == "quiz-2" && *published)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let scheduler = PublishScheduler::new(Arc::new(mock), Arc::new(ManualClock::new(Utc::now())));
        let report = scheduler.tick().await;

        assert_eq!(report.published, 1);
        assert_eq!(report.failed, 2);
        assert!(!report.skipped);
    }

    #[tokio::test]
    async fn overlapping_tick_is_skipped() {
        let mock = MockQuizRepository::new();
        let scheduler = PublishScheduler::new(Arc::new(mock), Arc::new(ManualClock::new(Utc::now())));

        let _running = scheduler.tick_lock.lock().await;
        let report = scheduler.tick().await;

        assert!(report.skipped);
        assert!(report.is_idle());
    }

    #[tokio::test]
    async fn background_loop_runs_until_stopped() {
        let now = Utc::now();
        let repo = Arc::new(InMemoryQuizRepository::new());
        let mut due = quiz("due");
        due.scheduled_publish = Some(now);
        let due_id = due.id.clone();
        repo.insert(due).await;

        let scheduler = Arc::new(PublishScheduler::new(repo.clone(), Arc::new(ManualClock::new(now))));
        scheduler.clone().start(std::time::Duration::from_millis(10)).await;
        assert!(scheduler.is_running().await);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(repo.find_by_id(&due_id).await.unwrap().unwrap().is_published);

        scheduler.stop().await;
        assert!(!scheduler.is_running().await);
    }
}
