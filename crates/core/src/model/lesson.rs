use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LearnerId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A unit of course content that vocabulary and quiz items hang off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    id: LessonId,
    title: String,
    description: Option<String>,
}

impl Lesson {
    /// Creates a lesson with a validated title.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the title is blank.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            description,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// Per-learner completion state for a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub learner_id: LearnerId,
    pub lesson_id: LessonId,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    /// A fresh, not-yet-completed progress marker.
    #[must_use]
    pub fn not_started(learner_id: LearnerId, lesson_id: LessonId) -> Self {
        Self {
            learner_id,
            lesson_id,
            completed: false,
            completed_at: None,
        }
    }

    /// Marks the lesson completed at `now`. Completing twice keeps the first
    /// completion timestamp.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        if !self.completed {
            self.completed = true;
            self.completed_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn lesson_requires_title() {
        let err = Lesson::new(LessonId::new(1), "  ", None).unwrap_err();
        assert_eq!(err, LessonError::EmptyTitle);
    }

    #[test]
    fn completing_twice_keeps_first_timestamp() {
        let mut progress = LessonProgress::not_started(LearnerId::new(1), LessonId::new(2));
        let first = fixed_now();
        progress.complete(first);
        progress.complete(first + Duration::days(1));

        assert!(progress.completed);
        assert_eq!(progress.completed_at, Some(first));
    }
}
