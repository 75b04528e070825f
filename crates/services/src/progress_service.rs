use std::sync::Arc;

use kumano_core::model::{LearnerId, ReviewProgress};
use storage::repository::{LessonRepository, ProgressRepository};

use crate::error::ProgressServiceError;

/// Aggregate view of one learner's progress across the whole course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnerSummary {
    pub lessons_completed: usize,
    pub lessons_total: usize,
    pub correct_answers: u64,
    pub total_answers: u64,
}

impl LearnerSummary {
    /// Fraction of answers that were correct, or `None` before any attempt.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        if self.total_answers == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.correct_answers as f64 / self.total_answers as f64)
    }
}

/// Reports per-learner statistics over stored review progress.
#[derive(Clone)]
pub struct ProgressService {
    lessons: Arc<dyn LessonRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(lessons: Arc<dyn LessonRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { lessons, progress }
    }

    /// All review progress rows for the learner, ordered by item ID.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn review_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ReviewProgress>, ProgressServiceError> {
        let rows = self.progress.progress_for_learner(learner_id).await?;
        Ok(rows)
    }

    /// Roll up lesson completion and answer counters for the learner.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn summary(
        &self,
        learner_id: LearnerId,
    ) -> Result<LearnerSummary, ProgressServiceError> {
        let statuses = self.lessons.lesson_progress(learner_id).await?;
        let rows = self.progress.progress_for_learner(learner_id).await?;

        let lessons_completed = statuses.iter().filter(|s| s.progress.completed).count();
        let correct_answers = rows
            .iter()
            .map(|row| u64::from(row.correct_attempts))
            .sum();
        let total_answers = rows.iter().map(|row| u64::from(row.review_count())).sum();

        Ok(LearnerSummary {
            lessons_completed,
            lessons_total: statuses.len(),
            correct_answers,
            total_answers,
        })
    }
}
