use chrono::{DateTime, Utc};
use tracing::debug;

use kumano_core::model::{LearnerId, LessonId, QuizItemId, ReviewProgress};
use kumano_core::scheduler::Candidate;

use super::{
    SqliteRepository,
    mapping::{id_i64, map_candidate_row, map_progress_row},
};
use crate::repository::{ProgressRepository, StorageError};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn fetch_candidates(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Vec<Candidate>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                q.id, q.lesson_id, q.question,
                q.answer_0, q.answer_1, q.answer_2, q.answer_3, q.correct_index,
                p.last_attempted, p.last_correct,
                p.correct_attempts, p.incorrect_attempts, p.next_review_date
            FROM quiz_items q
            LEFT JOIN review_progress p
                ON p.item_id = q.id AND p.learner_id = ?1
            WHERE q.lesson_id = ?2
            ",
        )
        .bind(id_i64("learner_id", learner_id.value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            candidates.push(map_candidate_row(learner_id, &row)?);
        }
        Ok(candidates)
    }

    async fn record_attempt(
        &self,
        learner_id: LearnerId,
        item_id: QuizItemId,
        now: DateTime<Utc>,
        was_correct: bool,
    ) -> Result<ReviewProgress, StorageError> {
        let learner = id_i64("learner_id", learner_id.value())?;
        let item = id_i64("item_id", item_id.value())?;

        // Single transaction around the read-modify-write so concurrent
        // submissions for the same (learner, item) pair cannot lose counter
        // increments, and a failure leaves nothing behind.
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let exists = sqlx::query("SELECT 1 FROM quiz_items WHERE id = ?1")
            .bind(item)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let existing = sqlx::query(
            r"
            SELECT item_id, last_attempted, last_correct,
                   correct_attempts, incorrect_attempts, next_review_date
            FROM review_progress
            WHERE learner_id = ?1 AND item_id = ?2
            ",
        )
        .bind(learner)
        .bind(item)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;

        let updated = match existing {
            Some(row) => {
                let mut progress = map_progress_row(learner_id, &row)?;
                progress.apply_attempt(now, was_correct);
                progress
            }
            None => ReviewProgress::first_attempt(learner_id, item_id, now, was_correct),
        };

        sqlx::query(
            r"
            INSERT INTO review_progress (
                learner_id, item_id, last_attempted, last_correct,
                correct_attempts, incorrect_attempts, next_review_date
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(learner_id, item_id) DO UPDATE SET
                last_attempted = excluded.last_attempted,
                last_correct = excluded.last_correct,
                correct_attempts = excluded.correct_attempts,
                incorrect_attempts = excluded.incorrect_attempts,
                next_review_date = excluded.next_review_date
            ",
        )
        .bind(learner)
        .bind(item)
        .bind(updated.last_attempted)
        .bind(updated.last_correct)
        .bind(i64::from(updated.correct_attempts))
        .bind(i64::from(updated.incorrect_attempts))
        .bind(updated.next_review_date)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        debug!(
            learner = %learner_id,
            item = %item_id,
            correct = was_correct,
            next_review = %updated.next_review_date,
            "recorded quiz attempt"
        );

        Ok(updated)
    }

    async fn get_progress(
        &self,
        learner_id: LearnerId,
        item_id: QuizItemId,
    ) -> Result<Option<ReviewProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT item_id, last_attempted, last_correct,
                   correct_attempts, incorrect_attempts, next_review_date
            FROM review_progress
            WHERE learner_id = ?1 AND item_id = ?2
            ",
        )
        .bind(id_i64("learner_id", learner_id.value())?)
        .bind(id_i64("item_id", item_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.map(|row| map_progress_row(learner_id, &row)).transpose()
    }

    async fn progress_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ReviewProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT item_id, last_attempted, last_correct,
                   correct_attempts, incorrect_attempts, next_review_date
            FROM review_progress
            WHERE learner_id = ?1
            ORDER BY item_id ASC
            ",
        )
        .bind(id_i64("learner_id", learner_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(learner_id, &row)?);
        }
        Ok(out)
    }
}
