//! End-to-end quiz flow over in-memory storage: seed a lesson, pull a batch,
//! answer questions, and watch the schedule reorder the next batch.

use std::sync::Arc;

use chrono::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;

use kumano_core::Clock;
use kumano_core::model::{LearnerId, Lesson, LessonId, QuizItem, QuizItemId};
use kumano_core::time::fixed_now;
use services::{
    AppServices, AttemptService, DEFAULT_BATCH_SIZE, ProgressService, QuizService,
};
use storage::repository::{LessonRepository, QuizItemRepository, Storage};

fn build_item(id: u64, lesson_id: LessonId) -> QuizItem {
    QuizItem::new(
        QuizItemId::new(id),
        lesson_id,
        format!("question {id}"),
        vec!["a".into(), "b".into(), "c".into(), "d".into()],
        0,
    )
    .unwrap()
}

async fn seed(storage: &Storage, item_count: u64) -> LessonId {
    let lesson = Lesson::new(LessonId::new(1), "Basics".to_string(), None).unwrap();
    storage.lessons.upsert_lesson(&lesson).await.unwrap();
    for id in 1..=item_count {
        storage
            .items
            .create_item(&build_item(id, lesson.id()))
            .await
            .unwrap();
    }
    lesson.id()
}

#[tokio::test]
async fn attempted_item_drops_behind_unseen_ones() {
    let storage = Storage::in_memory();
    let lesson_id = seed(&storage, 3).await;
    let learner = LearnerId::new(7);
    let clock = Clock::fixed(fixed_now());

    let quiz = QuizService::new(clock, Arc::clone(&storage.progress));
    let attempts = AttemptService::new(clock, Arc::clone(&storage.progress));

    // Answer item 2 correctly. It is now scheduled a day out, so the next
    // batch puts the two untouched items ahead of it.
    attempts
        .record_attempt(learner, QuizItemId::new(2), true)
        .await
        .unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let batch = quiz
        .select_batch_with_rng(learner, lesson_id, 3, &mut rng)
        .await
        .unwrap();

    assert_eq!(batch.len(), 3);
    assert_eq!(batch[2].id(), QuizItemId::new(2));
    assert!(batch[..2].iter().all(|item| item.id() != QuizItemId::new(2)));
}

#[tokio::test]
async fn missed_items_come_back_before_mastered_ones() {
    let storage = Storage::in_memory();
    let lesson_id = seed(&storage, 3).await;
    let learner = LearnerId::new(7);
    let start = fixed_now();

    // Session one: get item 1 right, item 2 wrong, leave item 3 untouched.
    let attempts = AttemptService::new(Clock::fixed(start), Arc::clone(&storage.progress));
    attempts
        .record_attempt(learner, QuizItemId::new(1), true)
        .await
        .unwrap();
    attempts
        .record_attempt(learner, QuizItemId::new(2), false)
        .await
        .unwrap();

    // Two hours later the wrong answer's one-hour retry window has passed,
    // while the correct answer is still scheduled tomorrow.
    let later = Clock::fixed(start + Duration::hours(2));
    let quiz = QuizService::new(later, Arc::clone(&storage.progress));
    let mut rng = StdRng::seed_from_u64(7);
    let batch = quiz
        .select_batch_with_rng(learner, lesson_id, 3, &mut rng)
        .await
        .unwrap();

    let ids: Vec<u64> = batch.iter().map(|item| item.id().value()).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[tokio::test]
async fn repeated_correct_answers_stretch_the_interval() {
    let storage = Storage::in_memory();
    seed(&storage, 1).await;
    let learner = LearnerId::new(7);
    let item = QuizItemId::new(1);

    let mut now = fixed_now();
    let mut expected_gap = Duration::days(1);
    for _ in 0..4 {
        let attempts =
            AttemptService::new(Clock::fixed(now), Arc::clone(&storage.progress));
        let progress = attempts.record_attempt(learner, item, true).await.unwrap();
        assert_eq!(progress.next_review_date, now + expected_gap);

        now = progress.next_review_date;
        expected_gap = expected_gap * 2;
    }
}

#[tokio::test]
async fn summary_reflects_a_finished_session() {
    let storage = Storage::in_memory();
    let lesson_id = seed(&storage, 2).await;
    let learner = LearnerId::new(7);
    let clock = Clock::fixed(fixed_now());

    let attempts = AttemptService::new(clock, Arc::clone(&storage.progress));
    attempts
        .record_attempt(learner, QuizItemId::new(1), true)
        .await
        .unwrap();
    attempts
        .record_attempt(learner, QuizItemId::new(2), false)
        .await
        .unwrap();
    storage
        .lessons
        .mark_completed(learner, lesson_id, clock.now())
        .await
        .unwrap();

    let progress = ProgressService::new(
        Arc::clone(&storage.lessons),
        Arc::clone(&storage.progress),
    );
    let summary = progress.summary(learner).await.unwrap();

    assert_eq!(summary.lessons_completed, 1);
    assert_eq!(summary.lessons_total, 1);
    assert_eq!(summary.correct_answers, 1);
    assert_eq!(summary.total_answers, 2);
}

#[tokio::test]
async fn app_services_wire_up_over_in_memory_storage() {
    let services = AppServices::new_in_memory(Clock::fixed(fixed_now()));
    let lesson = services
        .lessons()
        .upsert_lesson(LessonId::new(1), "Basics".to_string(), None)
        .await
        .unwrap();

    let batch = services
        .quiz()
        .select_batch(LearnerId::new(1), lesson.id(), DEFAULT_BATCH_SIZE)
        .await
        .unwrap();
    assert!(batch.is_empty());
}
