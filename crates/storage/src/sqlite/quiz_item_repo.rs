use kumano_core::model::{LessonId, QuizItem};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_quiz_item_row},
};
use crate::repository::{QuizItemRepository, StorageError};

#[async_trait::async_trait]
impl QuizItemRepository for SqliteRepository {
    async fn create_item(&self, item: &QuizItem) -> Result<(), StorageError> {
        let answers = item.answers();

        let result = sqlx::query(
            r"
            INSERT INTO quiz_items (
                id, lesson_id, question,
                answer_0, answer_1, answer_2, answer_3,
                correct_index
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_i64("item_id", item.id().value())?)
        .bind(id_i64("lesson_id", item.lesson_id().value())?)
        .bind(item.question().to_owned())
        .bind(answers[0].clone())
        .bind(answers[1].clone())
        .bind(answers[2].clone())
        .bind(answers[3].clone())
        .bind(i64::try_from(item.correct_index()).unwrap_or_default())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Conflict)
            }
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(StorageError::NotFound)
            }
            Err(e) => Err(StorageError::Connection(e.to_string())),
        }
    }

    async fn items_for_lesson(&self, lesson_id: LessonId) -> Result<Vec<QuizItem>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, question, answer_0, answer_1, answer_2, answer_3, correct_index
            FROM quiz_items
            WHERE lesson_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(map_quiz_item_row(&row)?);
        }
        Ok(items)
    }
}
