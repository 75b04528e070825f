use kumano_core::model::{LessonId, VocabularyEntry};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_vocabulary_row},
};
use crate::repository::{StorageError, VocabularyRepository};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl VocabularyRepository for SqliteRepository {
    async fn add_entries(&self, entries: &[VocabularyEntry]) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }

        // One transaction per batch so a bad row rolls back the whole load.
        let mut tx = self.pool.begin().await.map_err(conn)?;

        for entry in entries {
            let result = sqlx::query(
                r"
                INSERT INTO vocabulary (id, lesson_id, kanji, pronunciation, romaji, meaning)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(id_i64("vocabulary_id", entry.id().value())?)
            .bind(id_i64("lesson_id", entry.lesson_id().value())?)
            .bind(entry.kanji().map(str::to_owned))
            .bind(entry.pronunciation().to_owned())
            .bind(entry.romaji().to_owned())
            .bind(entry.meaning().to_owned())
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {}
                Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                    return Err(StorageError::NotFound);
                }
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    return Err(StorageError::Conflict);
                }
                Err(e) => return Err(conn(e)),
            }
        }

        tx.commit().await.map_err(conn)
    }

    async fn vocabulary_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<VocabularyEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, kanji, pronunciation, romaji, meaning
            FROM vocabulary
            WHERE lesson_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(map_vocabulary_row(&row)?);
        }
        Ok(entries)
    }
}
