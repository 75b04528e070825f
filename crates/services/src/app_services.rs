use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::attempt_service::AttemptService;
use crate::error::AppServicesError;
use crate::lesson_service::LessonService;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quiz: Arc<QuizService>,
    attempts: Arc<AttemptService>,
    lessons: Arc<LessonService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Sqlite` if the pool or migrations fail.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over in-memory storage, mainly for tests.
    #[must_use]
    pub fn new_in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let quiz = Arc::new(QuizService::new(clock, Arc::clone(&storage.progress)));
        let attempts = Arc::new(AttemptService::new(clock, Arc::clone(&storage.progress)));
        let lessons = Arc::new(LessonService::new(
            clock,
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.vocabulary),
        ));
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.progress),
        ));

        Self {
            quiz,
            attempts,
            lessons,
            progress,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempts)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
