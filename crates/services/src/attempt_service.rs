use std::sync::Arc;

use kumano_core::model::{LearnerId, QuizItemId, ReviewProgress};
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::error::AttemptServiceError;

/// Records quiz answers and applies the review schedule update.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl AttemptService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Record one answer for the learner and return the updated progress row.
    ///
    /// A correct answer pushes the next review out by an interval that doubles
    /// with each prior review; an incorrect answer schedules a retry in one
    /// hour. The update is atomic per `(learner, item)` pair, so concurrent
    /// submissions cannot lose counter increments.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) when the quiz item does not
    /// exist. Returns `AttemptServiceError::Storage` if persistence fails.
    pub async fn record_attempt(
        &self,
        learner_id: LearnerId,
        item_id: QuizItemId,
        was_correct: bool,
    ) -> Result<ReviewProgress, AttemptServiceError> {
        let now = self.clock.now();
        let progress = self
            .progress
            .record_attempt(learner_id, item_id, now, was_correct)
            .await?;
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use kumano_core::model::{Lesson, LessonId, QuizItem};
    use kumano_core::time::{fixed_clock, fixed_now};
    use storage::repository::{
        LessonRepository, QuizItemRepository, Storage, StorageError,
    };

    async fn storage_with_item() -> Storage {
        let storage = Storage::in_memory();
        let lesson = Lesson::new(LessonId::new(1), "Basics".to_string(), None).unwrap();
        storage.lessons.upsert_lesson(&lesson).await.unwrap();
        let item = QuizItem::new(
            QuizItemId::new(1),
            lesson.id(),
            "question".to_string(),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            0,
        )
        .unwrap();
        storage.items.create_item(&item).await.unwrap();
        storage
    }

    #[tokio::test]
    async fn correct_answer_schedules_one_day_out() {
        let storage = storage_with_item().await;
        let service = AttemptService::new(fixed_clock(), Arc::clone(&storage.progress));

        let progress = service
            .record_attempt(LearnerId::new(1), QuizItemId::new(1), true)
            .await
            .unwrap();

        assert_eq!(progress.correct_attempts, 1);
        assert_eq!(progress.next_review_date, fixed_now() + Duration::days(1));
    }

    #[tokio::test]
    async fn incorrect_answer_schedules_retry_in_an_hour() {
        let storage = storage_with_item().await;
        let service = AttemptService::new(fixed_clock(), Arc::clone(&storage.progress));

        let progress = service
            .record_attempt(LearnerId::new(1), QuizItemId::new(1), false)
            .await
            .unwrap();

        assert_eq!(progress.incorrect_attempts, 1);
        assert_eq!(progress.next_review_date, fixed_now() + Duration::hours(1));
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let storage = storage_with_item().await;
        let service = AttemptService::new(fixed_clock(), Arc::clone(&storage.progress));

        let err = service
            .record_attempt(LearnerId::new(1), QuizItemId::new(99), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AttemptServiceError::Storage(StorageError::NotFound)
        ));
    }
}
