#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, LessonRepository, LessonStatus, ProgressRepository, QuizItemRepository,
    Storage, StorageError, VocabularyRepository,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
