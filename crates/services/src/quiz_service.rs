use std::sync::Arc;

use rand::Rng;

use kumano_core::model::{LearnerId, LessonId, QuizItem};
use kumano_core::scheduler;
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::error::QuizServiceError;

/// Batch size used when the caller does not ask for a specific count.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Assembles review batches for a learner from a lesson's question pool.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Select up to `count` quiz items for the learner, most urgent first.
    ///
    /// Ordering follows the review schedule: unseen items first, then items
    /// whose next review date has passed, then scheduled items, with
    /// frequently-missed items ahead of their peers and random tie-breaking
    /// among equals. Fewer than `count` items are returned when the lesson
    /// pool is smaller.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::InvalidBatchSize` when `count` is zero.
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn select_batch(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
        count: usize,
    ) -> Result<Vec<QuizItem>, QuizServiceError> {
        self.select_batch_with_rng(learner_id, lesson_id, count, &mut rand::rng())
            .await
    }

    /// Same as [`select_batch`](Self::select_batch) but with a caller-supplied
    /// RNG, so tests can pin the tie-break order.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::InvalidBatchSize` when `count` is zero.
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn select_batch_with_rng<R: Rng + ?Sized>(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<QuizItem>, QuizServiceError> {
        if count == 0 {
            return Err(QuizServiceError::InvalidBatchSize { requested: count });
        }

        let now = self.clock.now();
        let candidates = self.progress.fetch_candidates(learner_id, lesson_id).await?;
        let batch = scheduler::select_batch(candidates, now, count, rng);

        tracing::debug!(
            learner = %learner_id,
            lesson = %lesson_id,
            requested = count,
            selected = batch.len(),
            "selected quiz batch"
        );

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use kumano_core::model::{Lesson, QuizItemId};
    use kumano_core::time::{fixed_clock, fixed_now};
    use storage::repository::{
        InMemoryRepository, LessonRepository, QuizItemRepository, Storage,
    };

    fn build_item(id: u64, lesson_id: LessonId) -> QuizItem {
        QuizItem::new(
            QuizItemId::new(id),
            lesson_id,
            format!("question {id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            0,
        )
        .unwrap()
    }

    async fn seeded_storage(item_count: u64) -> Storage {
        let storage = Storage::in_memory();
        let lesson = Lesson::new(LessonId::new(1), "Basics".to_string(), None).unwrap();
        storage.lessons.upsert_lesson(&lesson).await.unwrap();
        for id in 1..=item_count {
            storage
                .items
                .create_item(&build_item(id, lesson.id()))
                .await
                .unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn zero_count_is_rejected_without_touching_storage() {
        let service = QuizService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let err = service
            .select_batch(LearnerId::new(1), LessonId::new(1), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::InvalidBatchSize { requested: 0 }
        ));
    }

    #[tokio::test]
    async fn empty_lesson_yields_empty_batch() {
        let storage = seeded_storage(0).await;
        let service = QuizService::new(fixed_clock(), Arc::clone(&storage.progress));
        let batch = service
            .select_batch(LearnerId::new(1), LessonId::new(1), DEFAULT_BATCH_SIZE)
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn batch_is_capped_at_requested_count() {
        let storage = seeded_storage(15).await;
        let service = QuizService::new(fixed_clock(), Arc::clone(&storage.progress));
        let batch = service
            .select_batch(LearnerId::new(1), LessonId::new(1), DEFAULT_BATCH_SIZE)
            .await
            .unwrap();
        assert_eq!(batch.len(), DEFAULT_BATCH_SIZE);
    }

    #[tokio::test]
    async fn urgent_items_come_before_scheduled_ones() {
        let storage = seeded_storage(3).await;
        let learner = LearnerId::new(7);
        let now = fixed_now();

        // Item 2 was answered correctly and is not due for another day.
        // Item 3 was answered incorrectly an hour and a bit ago, so it is due.
        // Item 1 has never been attempted.
        storage
            .progress
            .record_attempt(learner, QuizItemId::new(2), now, true)
            .await
            .unwrap();
        storage
            .progress
            .record_attempt(learner, QuizItemId::new(3), now - Duration::minutes(70), false)
            .await
            .unwrap();

        let service = QuizService::new(fixed_clock(), Arc::clone(&storage.progress));
        let mut rng = StdRng::seed_from_u64(42);
        let batch = service
            .select_batch_with_rng(learner, LessonId::new(1), 3, &mut rng)
            .await
            .unwrap();

        let ids: Vec<u64> = batch.iter().map(|item| item.id().value()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }
}
