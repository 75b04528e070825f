use chrono::{DateTime, Utc};

use kumano_core::model::{LearnerId, Lesson, LessonId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_lesson_row, map_lesson_status_row},
};
use crate::repository::{LessonRepository, LessonStatus, StorageError};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, title, description)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description
            ",
        )
        .bind(id_i64("lesson_id", lesson.id().value())?)
        .bind(lesson.title().to_owned())
        .bind(lesson.description().map(str::to_owned))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description
            FROM lessons
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in rows {
            lessons.push(map_lesson_row(&row)?);
        }
        Ok(lessons)
    }

    async fn mark_completed(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO lesson_progress (learner_id, lesson_id, completed, completed_at)
            VALUES (?1, ?2, 1, ?3)
            ON CONFLICT(learner_id, lesson_id) DO UPDATE SET
                completed = 1,
                -- keep the first completion timestamp on repeat calls
                completed_at = COALESCE(lesson_progress.completed_at, excluded.completed_at)
            ",
        )
        .bind(id_i64("learner_id", learner_id.value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(StorageError::NotFound)
            }
            Err(e) => Err(conn(e)),
        }
    }

    async fn lesson_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LessonStatus>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                l.id, l.title, l.description,
                p.completed, p.completed_at
            FROM lessons l
            LEFT JOIN lesson_progress p
                ON p.lesson_id = l.id AND p.learner_id = ?1
            ORDER BY l.id ASC
            ",
        )
        .bind(id_i64("learner_id", learner_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut statuses = Vec::with_capacity(rows.len());
        for row in rows {
            let (lesson, progress) = map_lesson_status_row(learner_id, &row)?;
            statuses.push(LessonStatus { lesson, progress });
        }
        Ok(statuses)
    }
}
