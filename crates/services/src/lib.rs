#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempt_service;
pub mod error;
pub mod lesson_service;
pub mod progress_service;
pub mod quiz_service;

pub use kumano_core::Clock;

pub use app_services::AppServices;
pub use attempt_service::AttemptService;
pub use error::{
    AppServicesError, AttemptServiceError, LessonServiceError, ProgressServiceError,
    QuizServiceError,
};
pub use lesson_service::LessonService;
pub use progress_service::{LearnerSummary, ProgressService};
pub use quiz_service::{DEFAULT_BATCH_SIZE, QuizService};
