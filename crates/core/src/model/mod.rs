mod ids;
mod lesson;
mod progress;
mod quiz_item;
mod vocabulary;

pub use ids::{LearnerId, LessonId, ParseIdError, QuizItemId, VocabularyId};
pub use lesson::{Lesson, LessonError, LessonProgress};
pub use progress::{MAX_BACKOFF_EXPONENT, ProgressError, ReviewProgress};
pub use quiz_item::{ANSWER_COUNT, QuizItem, QuizItemError};
pub use vocabulary::{VocabularyEntry, VocabularyError};
