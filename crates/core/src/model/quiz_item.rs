use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, QuizItemId};

/// Number of candidate answers on every quiz item.
pub const ANSWER_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizItemError {
    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("expected {expected} candidate answers, got {provided}", expected = ANSWER_COUNT)]
    WrongAnswerCount { provided: usize },

    #[error("candidate answer {index} cannot be empty")]
    EmptyAnswer { index: usize },

    #[error("correct answer index must be < {limit}, got {provided}", limit = ANSWER_COUNT)]
    CorrectIndexOutOfRange { provided: usize },
}

//
// ─── QUIZ ITEM ─────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question belonging to a lesson.
///
/// Every item carries exactly [`ANSWER_COUNT`] candidate answers and the index
/// of the correct one. Items are immutable once created; content editing is
/// handled by replacing the item, not mutating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    id: QuizItemId,
    lesson_id: LessonId,
    question: String,
    answers: [String; ANSWER_COUNT],
    correct_index: usize,
}

impl QuizItem {
    /// Creates a validated quiz item.
    ///
    /// # Errors
    ///
    /// - `EmptyQuestion` if the question is blank
    /// - `WrongAnswerCount` if `answers` does not hold exactly four entries
    /// - `EmptyAnswer` if any candidate answer is blank
    /// - `CorrectIndexOutOfRange` if `correct_index` is not in `0..4`
    pub fn new(
        id: QuizItemId,
        lesson_id: LessonId,
        question: impl Into<String>,
        answers: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, QuizItemError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(QuizItemError::EmptyQuestion);
        }

        let answers: [String; ANSWER_COUNT] = answers
            .try_into()
            .map_err(|v: Vec<String>| QuizItemError::WrongAnswerCount { provided: v.len() })?;

        if let Some(index) = answers.iter().position(|a| a.trim().is_empty()) {
            return Err(QuizItemError::EmptyAnswer { index });
        }

        if correct_index >= ANSWER_COUNT {
            return Err(QuizItemError::CorrectIndexOutOfRange {
                provided: correct_index,
            });
        }

        Ok(Self {
            id,
            lesson_id,
            question,
            answers,
            correct_index,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizItemId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answers(&self) -> &[String; ANSWER_COUNT] {
        &self.answers
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// Returns true when `choice` selects the correct answer.
    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_index
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn builds_valid_item() {
        let item = QuizItem::new(
            QuizItemId::new(1),
            LessonId::new(1),
            "What does 'mizu' mean?",
            answers(&["water", "fire", "tree", "stone"]),
            0,
        )
        .unwrap();

        assert_eq!(item.question(), "What does 'mizu' mean?");
        assert_eq!(item.answers().len(), ANSWER_COUNT);
        assert!(item.is_correct(0));
        assert!(!item.is_correct(3));
    }

    #[test]
    fn rejects_blank_question() {
        let err = QuizItem::new(
            QuizItemId::new(1),
            LessonId::new(1),
            "   ",
            answers(&["a", "b", "c", "d"]),
            0,
        )
        .unwrap_err();
        assert_eq!(err, QuizItemError::EmptyQuestion);
    }

    #[test]
    fn rejects_wrong_answer_count() {
        let err = QuizItem::new(
            QuizItemId::new(1),
            LessonId::new(1),
            "Q",
            answers(&["a", "b", "c"]),
            0,
        )
        .unwrap_err();
        assert_eq!(err, QuizItemError::WrongAnswerCount { provided: 3 });

        let err = QuizItem::new(
            QuizItemId::new(1),
            LessonId::new(1),
            "Q",
            answers(&["a", "b", "c", "d", "e"]),
            0,
        )
        .unwrap_err();
        assert_eq!(err, QuizItemError::WrongAnswerCount { provided: 5 });
    }

    #[test]
    fn rejects_blank_answer() {
        let err = QuizItem::new(
            QuizItemId::new(1),
            LessonId::new(1),
            "Q",
            answers(&["a", " ", "c", "d"]),
            0,
        )
        .unwrap_err();
        assert_eq!(err, QuizItemError::EmptyAnswer { index: 1 });
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let err = QuizItem::new(
            QuizItemId::new(1),
            LessonId::new(1),
            "Q",
            answers(&["a", "b", "c", "d"]),
            4,
        )
        .unwrap_err();
        assert_eq!(err, QuizItemError::CorrectIndexOutOfRange { provided: 4 });
    }
}
