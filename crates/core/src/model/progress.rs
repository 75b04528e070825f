use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LearnerId, QuizItemId};

/// Cap on the exponential backoff exponent so the interval arithmetic can
/// never overflow. `2^12` days is a little over eleven years, which is far
/// beyond any review horizon we care about.
pub const MAX_BACKOFF_EXPONENT: u32 = 12;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("next review {next_review} is before last attempt {last_attempted}")]
    ScheduleBeforeAttempt {
        last_attempted: DateTime<Utc>,
        next_review: DateTime<Utc>,
    },
}

//
// ─── REVIEW PROGRESS ───────────────────────────────────────────────────────────
//

/// Per (learner, quiz item) review state.
///
/// A row exists only once the learner has answered the item at least once;
/// "never attempted" is modelled as the absence of a row, not as a row full of
/// nulls. The row is upserted in place on every subsequent attempt.
///
/// Schedule policy:
/// - correct answer: `next_review_date = now + 2^n days`, where `n` is the
///   number of attempts recorded before this one (so the first correct answer
///   lands one day out, and every later answer pushes the item exponentially
///   further);
/// - incorrect answer: short constant retry, `next_review_date = now + 1 hour`,
///   regardless of history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewProgress {
    pub learner_id: LearnerId,
    pub item_id: QuizItemId,
    pub last_attempted: DateTime<Utc>,
    pub last_correct: bool,
    pub correct_attempts: u32,
    pub incorrect_attempts: u32,
    pub next_review_date: DateTime<Utc>,
}

impl ReviewProgress {
    /// Creates the progress row for a pair's very first recorded attempt.
    #[must_use]
    pub fn first_attempt(
        learner_id: LearnerId,
        item_id: QuizItemId,
        now: DateTime<Utc>,
        was_correct: bool,
    ) -> Self {
        Self {
            learner_id,
            item_id,
            last_attempted: now,
            last_correct: was_correct,
            correct_attempts: u32::from(was_correct),
            incorrect_attempts: u32::from(!was_correct),
            next_review_date: next_review_after(now, was_correct, 0),
        }
    }

    /// Rebuilds a row from persisted columns, re-checking the invariants the
    /// store is supposed to maintain.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ScheduleBeforeAttempt` if the persisted schedule
    /// precedes the last attempt timestamp.
    pub fn from_persisted(
        learner_id: LearnerId,
        item_id: QuizItemId,
        last_attempted: DateTime<Utc>,
        last_correct: bool,
        correct_attempts: u32,
        incorrect_attempts: u32,
        next_review_date: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if next_review_date < last_attempted {
            return Err(ProgressError::ScheduleBeforeAttempt {
                last_attempted,
                next_review: next_review_date,
            });
        }

        Ok(Self {
            learner_id,
            item_id,
            last_attempted,
            last_correct,
            correct_attempts,
            incorrect_attempts,
            next_review_date,
        })
    }

    /// Applies one answer submission to an existing row.
    ///
    /// Counters only ever grow, and the recomputed schedule is always at or
    /// after `now`, so the row invariants hold by construction.
    pub fn apply_attempt(&mut self, now: DateTime<Utc>, was_correct: bool) {
        let prior_reviews = self.review_count();

        self.last_attempted = now;
        self.last_correct = was_correct;
        if was_correct {
            self.correct_attempts = self.correct_attempts.saturating_add(1);
        } else {
            self.incorrect_attempts = self.incorrect_attempts.saturating_add(1);
        }
        self.next_review_date = next_review_after(now, was_correct, prior_reviews);
    }

    /// Total attempts recorded for this pair.
    #[must_use]
    pub fn review_count(&self) -> u32 {
        self.correct_attempts.saturating_add(self.incorrect_attempts)
    }

    /// Returns true when the scheduled review is at or before `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }
}

/// Computes the next scheduled review for an attempt recorded at `now`.
///
/// `prior_reviews` is the number of attempts recorded before this one; it
/// drives the exponential backoff on the correct branch and is ignored on the
/// incorrect branch.
#[must_use]
pub fn next_review_after(now: DateTime<Utc>, was_correct: bool, prior_reviews: u32) -> DateTime<Utc> {
    if was_correct {
        let exponent = prior_reviews.min(MAX_BACKOFF_EXPONENT);
        now + Duration::days(1_i64 << exponent)
    } else {
        now + Duration::hours(1)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn pair() -> (LearnerId, QuizItemId) {
        (LearnerId::new(1), QuizItemId::new(10))
    }

    #[test]
    fn first_correct_attempt_schedules_one_day_out() {
        let (learner, item) = pair();
        let now = fixed_now();
        let progress = ReviewProgress::first_attempt(learner, item, now, true);

        assert_eq!(progress.next_review_date, now + Duration::days(1));
        assert_eq!(progress.incorrect_attempts, 0);
        assert_eq!(progress.correct_attempts, 1);
        assert!(progress.last_correct);
        assert_eq!(progress.last_attempted, now);
    }

    #[test]
    fn first_incorrect_attempt_schedules_one_hour_out() {
        let (learner, item) = pair();
        let now = fixed_now();
        let progress = ReviewProgress::first_attempt(learner, item, now, false);

        assert_eq!(progress.next_review_date, now + Duration::hours(1));
        assert_eq!(progress.incorrect_attempts, 1);
        assert_eq!(progress.correct_attempts, 0);
        assert!(!progress.last_correct);
    }

    #[test]
    fn repeated_incorrect_attempts_increment_and_reset_retry() {
        let (learner, item) = pair();
        let mut now = fixed_now();
        let mut progress = ReviewProgress::first_attempt(learner, item, now, false);

        for expected in 2..5 {
            now += Duration::minutes(10);
            progress.apply_attempt(now, false);
            assert_eq!(progress.incorrect_attempts, expected);
            assert_eq!(progress.next_review_date, now + Duration::hours(1));
        }
    }

    #[test]
    fn repeated_correct_attempts_grow_the_interval() {
        let (learner, item) = pair();
        let mut now = fixed_now();
        let mut progress = ReviewProgress::first_attempt(learner, item, now, true);

        let mut previous_gap = progress.next_review_date - progress.last_attempted;
        for _ in 0..5 {
            now = progress.next_review_date;
            progress.apply_attempt(now, true);
            let gap = progress.next_review_date - progress.last_attempted;
            assert!(gap > previous_gap);
            previous_gap = gap;
        }
    }

    #[test]
    fn incorrect_attempt_counter_is_monotonic_across_mixed_outcomes() {
        let (learner, item) = pair();
        let mut now = fixed_now();
        let mut progress = ReviewProgress::first_attempt(learner, item, now, false);

        now += Duration::hours(2);
        progress.apply_attempt(now, true);
        assert_eq!(progress.incorrect_attempts, 1);

        now += Duration::hours(2);
        progress.apply_attempt(now, false);
        assert_eq!(progress.incorrect_attempts, 2);
        assert_eq!(progress.review_count(), 3);
    }

    #[test]
    fn schedule_never_precedes_last_attempt() {
        let (learner, item) = pair();
        let mut now = fixed_now();
        let mut progress = ReviewProgress::first_attempt(learner, item, now, false);

        for correct in [true, false, true, true, false] {
            now += Duration::minutes(90);
            progress.apply_attempt(now, correct);
            assert!(progress.next_review_date >= progress.last_attempted);
        }
    }

    #[test]
    fn backoff_exponent_is_capped() {
        let now = fixed_now();
        let capped = next_review_after(now, true, u32::MAX);
        assert_eq!(
            capped,
            now + Duration::days(1_i64 << MAX_BACKOFF_EXPONENT)
        );
    }

    #[test]
    fn is_due_uses_at_or_before_now() {
        let (learner, item) = pair();
        let now = fixed_now();
        let progress = ReviewProgress::first_attempt(learner, item, now, true);

        assert!(!progress.is_due(now));
        assert!(progress.is_due(now + Duration::days(1)));
        assert!(progress.is_due(now + Duration::days(2)));
    }

    #[test]
    fn from_persisted_rejects_schedule_before_attempt() {
        let (learner, item) = pair();
        let now = fixed_now();
        let err = ReviewProgress::from_persisted(
            learner,
            item,
            now,
            true,
            1,
            0,
            now - Duration::hours(1),
        )
        .unwrap_err();

        assert!(matches!(err, ProgressError::ScheduleBeforeAttempt { .. }));
    }
}
