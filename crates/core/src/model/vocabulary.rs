use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, VocabularyId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VocabularyError {
    #[error("vocabulary {field} cannot be empty")]
    EmptyField { field: &'static str },
}

//
// ─── VOCABULARY ────────────────────────────────────────────────────────────────
//

/// One vocabulary row as seeded from course material.
///
/// Kanji is optional because beginner material often ships kana-only entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    id: VocabularyId,
    lesson_id: LessonId,
    kanji: Option<String>,
    pronunciation: String,
    romaji: String,
    meaning: String,
}

impl VocabularyEntry {
    /// Creates a validated vocabulary entry.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError::EmptyField` if pronunciation, romaji, or
    /// meaning is blank.
    pub fn new(
        id: VocabularyId,
        lesson_id: LessonId,
        kanji: Option<String>,
        pronunciation: impl Into<String>,
        romaji: impl Into<String>,
        meaning: impl Into<String>,
    ) -> Result<Self, VocabularyError> {
        let pronunciation = pronunciation.into();
        let romaji = romaji.into();
        let meaning = meaning.into();

        if pronunciation.trim().is_empty() {
            return Err(VocabularyError::EmptyField {
                field: "pronunciation",
            });
        }
        if romaji.trim().is_empty() {
            return Err(VocabularyError::EmptyField { field: "romaji" });
        }
        if meaning.trim().is_empty() {
            return Err(VocabularyError::EmptyField { field: "meaning" });
        }

        Ok(Self {
            id,
            lesson_id,
            kanji: kanji.filter(|k| !k.trim().is_empty()),
            pronunciation,
            romaji,
            meaning,
        })
    }

    #[must_use]
    pub fn id(&self) -> VocabularyId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn kanji(&self) -> Option<&str> {
        self.kanji.as_deref()
    }

    #[must_use]
    pub fn pronunciation(&self) -> &str {
        &self.pronunciation
    }

    #[must_use]
    pub fn romaji(&self) -> &str {
        &self.romaji
    }

    #[must_use]
    pub fn meaning(&self) -> &str {
        &self.meaning
    }
}
