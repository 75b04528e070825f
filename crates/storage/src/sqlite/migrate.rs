use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: lessons, vocabulary, quiz items with their four
/// candidate answers, per-learner review progress, per-learner lesson
/// completion, and the supporting indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lessons (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS vocabulary (
                    id INTEGER PRIMARY KEY,
                    lesson_id INTEGER NOT NULL,
                    kanji TEXT,
                    pronunciation TEXT NOT NULL,
                    romaji TEXT NOT NULL,
                    meaning TEXT NOT NULL,
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_items (
                    id INTEGER PRIMARY KEY,
                    lesson_id INTEGER NOT NULL,
                    question TEXT NOT NULL,
                    answer_0 TEXT NOT NULL,
                    answer_1 TEXT NOT NULL,
                    answer_2 TEXT NOT NULL,
                    answer_3 TEXT NOT NULL,
                    correct_index INTEGER NOT NULL CHECK (correct_index BETWEEN 0 AND 3),
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS review_progress (
                    learner_id INTEGER NOT NULL,
                    item_id INTEGER NOT NULL,
                    last_attempted TEXT NOT NULL,
                    last_correct INTEGER NOT NULL CHECK (last_correct IN (0, 1)),
                    correct_attempts INTEGER NOT NULL CHECK (correct_attempts >= 0),
                    incorrect_attempts INTEGER NOT NULL CHECK (incorrect_attempts >= 0),
                    next_review_date TEXT NOT NULL,
                    PRIMARY KEY (learner_id, item_id),
                    FOREIGN KEY (item_id) REFERENCES quiz_items(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_progress (
                    learner_id INTEGER NOT NULL,
                    lesson_id INTEGER NOT NULL,
                    completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
                    completed_at TEXT,
                    PRIMARY KEY (learner_id, lesson_id),
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quiz_items_lesson
                    ON quiz_items (lesson_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_vocabulary_lesson
                    ON vocabulary (lesson_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_review_progress_learner
                    ON review_progress (learner_id, next_review_date);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
