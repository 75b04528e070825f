use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use kumano_core::model::{
    Lesson, LessonId, LessonProgress, LearnerId, QuizItem, QuizItemId, ReviewProgress,
    VocabularyEntry,
};
use kumano_core::scheduler::Candidate;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A lesson joined with one learner's completion state.
///
/// Storage-level record so the progress view can render a full lesson list
/// without a second lookup; lessons the learner never touched carry a
/// `not_started` marker.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonStatus {
    pub lesson: Lesson,
    pub progress: LessonProgress,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Quiz item persistence. Content seeding is the only writer; items are
/// immutable once created.
#[async_trait]
pub trait QuizItemRepository: Send + Sync {
    /// Persist a new quiz item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if an item with the same id exists,
    /// `StorageError::NotFound` if the owning lesson is missing, or other
    /// storage errors.
    async fn create_item(&self, item: &QuizItem) -> Result<(), StorageError>;

    /// Fetch every quiz item belonging to a lesson. No ordering guarantee.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures. An unknown lesson yields an
    /// empty list, not an error.
    async fn items_for_lesson(&self, lesson_id: LessonId) -> Result<Vec<QuizItem>, StorageError>;
}

/// Per-learner review progress persistence.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Every quiz item of the lesson, left-joined with the learner's progress
    /// row (absent when never attempted). No ordering guarantee.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn fetch_candidates(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Vec<Candidate>, StorageError>;

    /// Atomically create-or-update the progress row for (learner, item),
    /// applying the spaced-repetition policy for one attempt recorded at
    /// `now`. The read-modify-write runs as a single transaction per key, so
    /// concurrent submissions for the same pair cannot lose counter
    /// increments.
    ///
    /// Returns the row as stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item does not exist (rejected
    /// before any mutation), or other storage errors. On error nothing is
    /// persisted.
    async fn record_attempt(
        &self,
        learner_id: LearnerId,
        item_id: QuizItemId,
        now: DateTime<Utc>,
        was_correct: bool,
    ) -> Result<ReviewProgress, StorageError>;

    /// The learner's progress row for one item, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_progress(
        &self,
        learner_id: LearnerId,
        item_id: QuizItemId,
    ) -> Result<Option<ReviewProgress>, StorageError>;

    /// All progress rows for a learner, across lessons.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn progress_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ReviewProgress>, StorageError>;
}

/// Lesson metadata and per-learner completion.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or update a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// All lessons, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_lessons(&self) -> Result<Vec<Lesson>, StorageError>;

    /// Mark a lesson completed for a learner at `now`. Idempotent: repeating
    /// keeps the first completion timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist, or other
    /// storage errors.
    async fn mark_completed(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Every lesson joined with the learner's completion state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn lesson_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LessonStatus>, StorageError>;
}

/// Vocabulary rows seeded from course material.
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    /// Persist a batch of vocabulary entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if an owning lesson is missing, or
    /// other storage errors.
    async fn add_entries(&self, entries: &[VocabularyEntry]) -> Result<(), StorageError>;

    /// All vocabulary for a lesson, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn vocabulary_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<VocabularyEntry>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    lessons: HashMap<LessonId, Lesson>,
    items: HashMap<QuizItemId, QuizItem>,
    progress: HashMap<(LearnerId, QuizItemId), ReviewProgress>,
    lesson_progress: HashMap<(LearnerId, LessonId), LessonProgress>,
    vocabulary: Vec<VocabularyEntry>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// The single mutex is held across each read-modify-write, which gives the
/// same per-key atomicity the SQLite backend gets from transactions.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuizItemRepository for InMemoryRepository {
    async fn create_item(&self, item: &QuizItem) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&item.lesson_id()) {
            return Err(StorageError::NotFound);
        }
        if guard.items.contains_key(&item.id()) {
            return Err(StorageError::Conflict);
        }
        guard.items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn items_for_lesson(&self, lesson_id: LessonId) -> Result<Vec<QuizItem>, StorageError> {
        let guard = self.lock()?;
        let mut items: Vec<QuizItem> = guard
            .items
            .values()
            .filter(|item| item.lesson_id() == lesson_id)
            .cloned()
            .collect();
        items.sort_by_key(QuizItem::id);
        Ok(items)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn fetch_candidates(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Vec<Candidate>, StorageError> {
        let guard = self.lock()?;
        let mut candidates: Vec<Candidate> = guard
            .items
            .values()
            .filter(|item| item.lesson_id() == lesson_id)
            .map(|item| {
                let progress = guard.progress.get(&(learner_id, item.id())).cloned();
                Candidate::new(item.clone(), progress)
            })
            .collect();
        candidates.sort_by_key(|c| c.item.id());
        Ok(candidates)
    }

    async fn record_attempt(
        &self,
        learner_id: LearnerId,
        item_id: QuizItemId,
        now: DateTime<Utc>,
        was_correct: bool,
    ) -> Result<ReviewProgress, StorageError> {
        let mut guard = self.lock()?;
        if !guard.items.contains_key(&item_id) {
            return Err(StorageError::NotFound);
        }

        let updated = match guard.progress.get(&(learner_id, item_id)) {
            Some(existing) => {
                let mut row = existing.clone();
                row.apply_attempt(now, was_correct);
                row
            }
            None => ReviewProgress::first_attempt(learner_id, item_id, now, was_correct),
        };
        guard
            .progress
            .insert((learner_id, item_id), updated.clone());
        Ok(updated)
    }

    async fn get_progress(
        &self,
        learner_id: LearnerId,
        item_id: QuizItemId,
    ) -> Result<Option<ReviewProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(learner_id, item_id)).cloned())
    }

    async fn progress_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ReviewProgress>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<ReviewProgress> = guard
            .progress
            .values()
            .filter(|row| row.learner_id == learner_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.item_id);
        Ok(rows)
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        let mut lessons: Vec<Lesson> = guard.lessons.values().cloned().collect();
        lessons.sort_by_key(Lesson::id);
        Ok(lessons)
    }

    async fn mark_completed(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&lesson_id) {
            return Err(StorageError::NotFound);
        }
        let entry = guard
            .lesson_progress
            .entry((learner_id, lesson_id))
            .or_insert_with(|| LessonProgress::not_started(learner_id, lesson_id));
        entry.complete(now);
        Ok(())
    }

    async fn lesson_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LessonStatus>, StorageError> {
        let guard = self.lock()?;
        let mut statuses: Vec<LessonStatus> = guard
            .lessons
            .values()
            .map(|lesson| {
                let progress = guard
                    .lesson_progress
                    .get(&(learner_id, lesson.id()))
                    .copied()
                    .unwrap_or_else(|| LessonProgress::not_started(learner_id, lesson.id()));
                LessonStatus {
                    lesson: lesson.clone(),
                    progress,
                }
            })
            .collect();
        statuses.sort_by_key(|status| status.lesson.id());
        Ok(statuses)
    }
}

#[async_trait]
impl VocabularyRepository for InMemoryRepository {
    async fn add_entries(&self, entries: &[VocabularyEntry]) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        for entry in entries {
            if !guard.lessons.contains_key(&entry.lesson_id()) {
                return Err(StorageError::NotFound);
            }
        }
        guard.vocabulary.extend_from_slice(entries);
        Ok(())
    }

    async fn vocabulary_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<VocabularyEntry>, StorageError> {
        let guard = self.lock()?;
        let mut entries: Vec<VocabularyEntry> = guard
            .vocabulary
            .iter()
            .filter(|entry| entry.lesson_id() == lesson_id)
            .cloned()
            .collect();
        entries.sort_by_key(VocabularyEntry::id);
        Ok(entries)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn QuizItemRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub vocabulary: Arc<dyn VocabularyRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            items: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            vocabulary: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
