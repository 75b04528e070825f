use std::sync::Arc;

use kumano_core::model::{LearnerId, Lesson, LessonId, VocabularyEntry};
use storage::repository::{LessonRepository, LessonStatus, VocabularyRepository};

use crate::Clock;
use crate::error::LessonServiceError;

/// Orchestrates lesson content and per-learner lesson completion.
#[derive(Clone)]
pub struct LessonService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
    vocabulary: Arc<dyn VocabularyRepository>,
}

impl LessonService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonRepository>,
        vocabulary: Arc<dyn VocabularyRepository>,
    ) -> Self {
        Self {
            clock,
            lessons,
            vocabulary,
        }
    }

    /// Create or update a lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Lesson` for validation failures.
    /// Returns `LessonServiceError::Storage` if persistence fails.
    pub async fn upsert_lesson(
        &self,
        id: LessonId,
        title: String,
        description: Option<String>,
    ) -> Result<Lesson, LessonServiceError> {
        let lesson = Lesson::new(id, title, description)?;
        self.lessons.upsert_lesson(&lesson).await?;
        Ok(lesson)
    }

    /// List all lessons ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if repository access fails.
    pub async fn list_lessons(&self) -> Result<Vec<Lesson>, LessonServiceError> {
        let lessons = self.lessons.list_lessons().await?;
        Ok(lessons)
    }

    /// Vocabulary entries for one lesson, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if repository access fails.
    pub async fn vocabulary(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<VocabularyEntry>, LessonServiceError> {
        let entries = self.vocabulary.vocabulary_for_lesson(lesson_id).await?;
        Ok(entries)
    }

    /// Mark a lesson completed for the learner.
    ///
    /// Idempotent: repeating the call keeps the first completion timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) for an unknown lesson.
    pub async fn complete_lesson(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<(), LessonServiceError> {
        let now = self.clock.now();
        self.lessons
            .mark_completed(learner_id, lesson_id, now)
            .await?;
        Ok(())
    }

    /// Every lesson paired with the learner's completion state.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if repository access fails.
    pub async fn lesson_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LessonStatus>, LessonServiceError> {
        let statuses = self.lessons.lesson_progress(learner_id).await?;
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kumano_core::model::LessonError;
    use kumano_core::time::{fixed_clock, fixed_now};
    use storage::repository::Storage;

    fn service(storage: &Storage) -> LessonService {
        LessonService::new(
            fixed_clock(),
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.vocabulary),
        )
    }

    #[tokio::test]
    async fn upsert_rejects_blank_title() {
        let storage = Storage::in_memory();
        let err = service(&storage)
            .upsert_lesson(LessonId::new(1), "   ".to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LessonServiceError::Lesson(LessonError::EmptyTitle)
        ));
    }

    #[tokio::test]
    async fn completing_twice_keeps_first_timestamp() {
        let storage = Storage::in_memory();
        let svc = service(&storage);
        svc.upsert_lesson(LessonId::new(1), "Basics".to_string(), None)
            .await
            .unwrap();

        let learner = LearnerId::new(7);
        svc.complete_lesson(learner, LessonId::new(1)).await.unwrap();
        svc.complete_lesson(learner, LessonId::new(1)).await.unwrap();

        let statuses = svc.lesson_progress(learner).await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].progress.completed);
        assert_eq!(statuses[0].progress.completed_at, Some(fixed_now()));
    }
}
