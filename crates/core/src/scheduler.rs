use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{QuizItem, ReviewProgress};

//
// ─── TIERS ─────────────────────────────────────────────────────────────────────
//

/// Priority class for a (quiz item, learner progress) pair.
///
/// Tiers are mutually exclusive and evaluated in this fixed order; a lower
/// tier always outranks a higher one regardless of any per-item counters:
///
/// 0. [`Tier::Unseen`] — the learner has never attempted the item
/// 1. [`Tier::Due`] — a progress row exists and its review is due now
/// 2. [`Tier::CorrectScheduled`] — last answer was correct, review not yet due
/// 3. [`Tier::IncorrectScheduled`] — last answer was wrong, retry not yet due
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Unseen = 0,
    Due = 1,
    CorrectScheduled = 2,
    IncorrectScheduled = 3,
}

impl Tier {
    /// Classifies a pair into its tier.
    ///
    /// "Due" means `next_review_date <= now`; a review scheduled for exactly
    /// this instant is already due.
    #[must_use]
    pub fn classify(progress: Option<&ReviewProgress>, now: DateTime<Utc>) -> Self {
        match progress {
            None => Tier::Unseen,
            Some(p) if p.is_due(now) => Tier::Due,
            Some(p) if p.last_correct => Tier::CorrectScheduled,
            Some(_) => Tier::IncorrectScheduled,
        }
    }
}

//
// ─── CANDIDATES ────────────────────────────────────────────────────────────────
//

/// A quiz item joined with the learner's progress row, if any.
///
/// This is the shape the store's candidate query produces: every item of the
/// lesson, left-joined with at most one progress row for the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub item: QuizItem,
    pub progress: Option<ReviewProgress>,
}

impl Candidate {
    #[must_use]
    pub fn new(item: QuizItem, progress: Option<ReviewProgress>) -> Self {
        Self { item, progress }
    }

    #[must_use]
    pub fn tier(&self, now: DateTime<Utc>) -> Tier {
        Tier::classify(self.progress.as_ref(), now)
    }

    fn incorrect_attempts(&self) -> u32 {
        self.progress.as_ref().map_or(0, |p| p.incorrect_attempts)
    }
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// Picks the next batch of quiz items for a learner.
///
/// Ordering is tier ascending, then `incorrect_attempts` descending (items the
/// learner keeps missing surface first), then a random shuffle among the
/// remaining ties. Randomness is injected so production can use a thread RNG
/// while tests seed a deterministic one.
///
/// Returns at most `count` items; all eligible items if the lesson holds fewer
/// than `count`. An empty candidate list yields an empty batch.
#[must_use]
pub fn select_batch<R: Rng + ?Sized>(
    mut candidates: Vec<Candidate>,
    now: DateTime<Utc>,
    count: usize,
    rng: &mut R,
) -> Vec<QuizItem> {
    // Shuffle first, then stable-sort: equal keys keep their shuffled order,
    // which makes the tie-break unbiased without a custom comparator.
    candidates.shuffle(rng);
    candidates.sort_by_key(|c| (c.tier(now), Reverse(c.incorrect_attempts())));

    candidates
        .into_iter()
        .take(count)
        .map(|c| c.item)
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LearnerId, LessonId, QuizItemId, ReviewProgress};
    use crate::time::fixed_now;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn learner() -> LearnerId {
        LearnerId::new(1)
    }

    fn item(id: u64) -> QuizItem {
        QuizItem::new(
            QuizItemId::new(id),
            LessonId::new(1),
            format!("question {id}"),
            vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            0,
        )
        .unwrap()
    }

    fn progress(
        id: u64,
        last_correct: bool,
        incorrect_attempts: u32,
        due_in: Duration,
    ) -> ReviewProgress {
        let now = fixed_now();
        ReviewProgress::from_persisted(
            learner(),
            QuizItemId::new(id),
            now - Duration::days(1),
            last_correct,
            u32::from(last_correct),
            incorrect_attempts,
            now + due_in,
        )
        .unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn classifies_all_four_tiers() {
        let now = fixed_now();

        assert_eq!(Tier::classify(None, now), Tier::Unseen);

        let due = progress(1, true, 0, Duration::zero());
        assert_eq!(Tier::classify(Some(&due), now), Tier::Due);

        let overdue = progress(1, false, 2, -Duration::minutes(10));
        assert_eq!(Tier::classify(Some(&overdue), now), Tier::Due);

        let correct_ahead = progress(1, true, 0, Duration::days(3));
        assert_eq!(
            Tier::classify(Some(&correct_ahead), now),
            Tier::CorrectScheduled
        );

        let incorrect_ahead = progress(1, false, 1, Duration::minutes(30));
        assert_eq!(
            Tier::classify(Some(&incorrect_ahead), now),
            Tier::IncorrectScheduled
        );
    }

    #[test]
    fn never_attempted_then_due_then_correct_then_incorrect() {
        let now = fixed_now();
        let candidates = vec![
            Candidate::new(item(1), Some(progress(1, false, 0, Duration::hours(1)))),
            Candidate::new(item(2), Some(progress(2, true, 0, Duration::days(2)))),
            Candidate::new(item(3), Some(progress(3, true, 0, -Duration::hours(1)))),
            Candidate::new(item(4), None),
        ];

        let batch = select_batch(candidates, now, 10, &mut rng());

        let ids: Vec<u64> = batch.iter().map(|i| i.id().value()).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn struggling_items_surface_first_within_a_tier() {
        let now = fixed_now();
        let candidates = vec![
            Candidate::new(item(1), Some(progress(1, true, 1, -Duration::hours(1)))),
            Candidate::new(item(2), Some(progress(2, true, 5, -Duration::hours(1)))),
            Candidate::new(item(3), Some(progress(3, true, 3, -Duration::hours(1)))),
        ];

        let batch = select_batch(candidates, now, 10, &mut rng());

        let ids: Vec<u64> = batch.iter().map(|i| i.id().value()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn overdue_item_outranks_scheduled_ones_in_mixed_lesson() {
        // Lesson with A never attempted, B correct and due in 3 days,
        // C incorrect with two misses and overdue by 10 minutes.
        let now = fixed_now();
        let a = Candidate::new(item(1), None);
        let b = Candidate::new(item(2), Some(progress(2, true, 0, Duration::days(3))));
        let c = Candidate::new(item(3), Some(progress(3, false, 2, -Duration::minutes(10))));

        let batch = select_batch(vec![b, c, a], now, 10, &mut rng());

        let ids: Vec<u64> = batch.iter().map(|i| i.id().value()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn returns_at_most_count_items() {
        let now = fixed_now();
        let candidates: Vec<Candidate> =
            (1..=25).map(|id| Candidate::new(item(id), None)).collect();

        let batch = select_batch(candidates.clone(), now, 10, &mut rng());
        assert_eq!(batch.len(), 10);

        let all = select_batch(candidates, now, 100, &mut rng());
        assert_eq!(all.len(), 25);
    }

    #[test]
    fn empty_candidates_yield_empty_batch() {
        let batch = select_batch(Vec::new(), fixed_now(), 10, &mut rng());
        assert!(batch.is_empty());
    }

    #[test]
    fn tie_break_varies_with_rng_but_tiers_do_not() {
        let now = fixed_now();
        let candidates: Vec<Candidate> = (1..=6)
            .map(|id| Candidate::new(item(id), None))
            .chain((7..=9).map(|id| {
                Candidate::new(item(id), Some(progress(id, true, 0, Duration::days(1))))
            }))
            .collect();

        let first = select_batch(candidates.clone(), now, 9, &mut StdRng::seed_from_u64(1));
        let second = select_batch(candidates.clone(), now, 9, &mut StdRng::seed_from_u64(2));

        // Unseen items always occupy the first six slots in both draws.
        let unseen = |batch: &[QuizItem]| {
            batch
                .iter()
                .take(6)
                .map(|i| i.id().value())
                .collect::<std::collections::HashSet<_>>()
        };
        assert_eq!(unseen(&first), (1..=6).collect());
        assert_eq!(unseen(&second), (1..=6).collect());

        // Same seed reproduces the same order exactly.
        let replay = select_batch(candidates, now, 9, &mut StdRng::seed_from_u64(1));
        let ids = |batch: &[QuizItem]| batch.iter().map(|i| i.id().value()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&replay));
    }
}
