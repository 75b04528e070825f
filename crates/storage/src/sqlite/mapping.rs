use sqlx::Row;

use kumano_core::model::{
    Lesson, LessonId, LessonProgress, LearnerId, QuizItem, QuizItemId, ReviewProgress,
    VocabularyEntry, VocabularyId,
};
use kumano_core::scheduler::Candidate;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn item_id_from_i64(v: i64) -> Result<QuizItemId, StorageError> {
    Ok(QuizItemId::new(i64_to_u64("item_id", v)?))
}

fn counter_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_lesson_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lesson, StorageError> {
    Lesson::new(
        lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_quiz_item_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizItem, StorageError> {
    let answers = vec![
        row.try_get::<String, _>("answer_0").map_err(ser)?,
        row.try_get::<String, _>("answer_1").map_err(ser)?,
        row.try_get::<String, _>("answer_2").map_err(ser)?,
        row.try_get::<String, _>("answer_3").map_err(ser)?,
    ];

    let correct_index_i64: i64 = row.try_get("correct_index").map_err(ser)?;
    let correct_index = usize::try_from(correct_index_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid correct_index: {correct_index_i64}"))
    })?;

    QuizItem::new(
        item_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        row.try_get::<String, _>("question").map_err(ser)?,
        answers,
        correct_index,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(
    learner_id: LearnerId,
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ReviewProgress, StorageError> {
    ReviewProgress::from_persisted(
        learner_id,
        item_id_from_i64(row.try_get::<i64, _>("item_id").map_err(ser)?)?,
        row.try_get("last_attempted").map_err(ser)?,
        row.try_get::<bool, _>("last_correct").map_err(ser)?,
        counter_u32(
            "correct_attempts",
            row.try_get::<i64, _>("correct_attempts").map_err(ser)?,
        )?,
        counter_u32(
            "incorrect_attempts",
            row.try_get::<i64, _>("incorrect_attempts").map_err(ser)?,
        )?,
        row.try_get("next_review_date").map_err(ser)?,
    )
    .map_err(ser)
}

/// Maps one row of the candidate query: quiz item columns left-joined with the
/// learner's progress columns, all of which are NULL when no row exists.
pub(crate) fn map_candidate_row(
    learner_id: LearnerId,
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Candidate, StorageError> {
    let item = map_quiz_item_row(row)?;

    let last_attempted: Option<chrono::DateTime<chrono::Utc>> =
        row.try_get("last_attempted").map_err(ser)?;

    let progress = match last_attempted {
        None => None,
        Some(last_attempted) => Some(
            ReviewProgress::from_persisted(
                learner_id,
                item.id(),
                last_attempted,
                row.try_get::<bool, _>("last_correct").map_err(ser)?,
                counter_u32(
                    "correct_attempts",
                    row.try_get::<i64, _>("correct_attempts").map_err(ser)?,
                )?,
                counter_u32(
                    "incorrect_attempts",
                    row.try_get::<i64, _>("incorrect_attempts").map_err(ser)?,
                )?,
                row.try_get("next_review_date").map_err(ser)?,
            )
            .map_err(ser)?,
        ),
    };

    Ok(Candidate::new(item, progress))
}

pub(crate) fn map_lesson_status_row(
    learner_id: LearnerId,
    row: &sqlx::sqlite::SqliteRow,
) -> Result<(Lesson, LessonProgress), StorageError> {
    let lesson = map_lesson_row(row)?;

    let completed: Option<bool> = row.try_get("completed").map_err(ser)?;
    let progress = match completed {
        Some(true) => LessonProgress {
            learner_id,
            lesson_id: lesson.id(),
            completed: true,
            completed_at: row.try_get("completed_at").map_err(ser)?,
        },
        _ => LessonProgress::not_started(learner_id, lesson.id()),
    };

    Ok((lesson, progress))
}

pub(crate) fn map_vocabulary_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<VocabularyEntry, StorageError> {
    VocabularyEntry::new(
        VocabularyId::new(i64_to_u64(
            "vocabulary_id",
            row.try_get::<i64, _>("id").map_err(ser)?,
        )?),
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        row.try_get::<Option<String>, _>("kanji").map_err(ser)?,
        row.try_get::<String, _>("pronunciation").map_err(ser)?,
        row.try_get::<String, _>("romaji").map_err(ser)?,
        row.try_get::<String, _>("meaning").map_err(ser)?,
    )
    .map_err(ser)
}
