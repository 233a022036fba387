//! SM-2 spaced repetition scheduling.
//!
//! Pure functions from (card state, recall quality) to the next card state.
//! Nothing here touches the deck, the session window or storage.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Card, MAX_INTERVAL_DAYS, MIN_EASE_FACTOR, Quality};

/// Interval given after the first successful recall (and after any failure).
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval given after the second consecutive successful recall.
pub const SECOND_INTERVAL_DAYS: u32 = 6;

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Next scheduling state computed for a card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleOutcome {
    pub interval: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
    pub due: DateTime<Utc>,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// SM-2 scheduler.
///
/// - Ease factor moves by `0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)` and never
///   drops below [`MIN_EASE_FACTOR`].
/// - A quality below 3 resets repetitions to 0 and the interval to one day.
/// - Successes step the interval 1 → 6 → `round(interval * ease)`, where `ease`
///   is the freshly updated ease factor.
/// - A perfect score advances repetitions by two instead of one.
///
/// # Examples
///
/// ```
/// # use vocab_core::scheduler::Scheduler;
/// # use vocab_core::model::{Card, Quality, UnitId, WordId};
/// # use vocab_core::time::fixed_now;
/// let now = fixed_now();
/// let card = Card::new(WordId::new("w1")?, UnitId::FIRST, now, now);
///
/// let outcome = Scheduler::new().schedule(&card, Quality::new(3)?, now);
/// assert_eq!(outcome.interval, 1);
/// assert_eq!(outcome.repetitions, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute the next state of `card` after a review of the given `quality`.
    #[must_use]
    pub fn schedule(&self, card: &Card, quality: Quality, reviewed_at: DateTime<Utc>) -> ScheduleOutcome {
        let ease_factor = next_ease_factor(card.ease_factor, quality);

        let (interval, repetitions) = if quality.is_success() {
            let interval = match card.repetitions {
                0 => FIRST_INTERVAL_DAYS,
                1 => SECOND_INTERVAL_DAYS,
                _ => grow_interval(card.interval, ease_factor),
            };
            let step = if quality.is_perfect() { 2 } else { 1 };
            (interval, card.repetitions.saturating_add(step))
        } else {
            (FIRST_INTERVAL_DAYS, 0)
        };

        ScheduleOutcome {
            interval,
            ease_factor,
            repetitions,
            due: reviewed_at + Duration::days(i64::from(interval)),
        }
    }
}

/// Apply the SM-2 ease adjustment for `quality`, floored at [`MIN_EASE_FACTOR`].
#[must_use]
pub fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let miss = f64::from(5 - quality.value());
    let updated = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));
    if updated.is_finite() {
        updated.max(MIN_EASE_FACTOR)
    } else {
        MIN_EASE_FACTOR
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grow_interval(interval: u32, ease_factor: f64) -> u32 {
    let grown = (f64::from(interval) * ease_factor).round();
    grown.clamp(f64::from(FIRST_INTERVAL_DAYS), f64::from(MAX_INTERVAL_DAYS)) as u32
}

/// Human-readable interval ("1 day", "2 weeks", "3 months").
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_interval(days: u32) -> String {
    let rounded = |d: u32, per: u32| (f64::from(d) / f64::from(per)).round() as u32;
    match days {
        0 => "now".to_string(),
        1 => "1 day".to_string(),
        2..=6 => format!("{days} days"),
        7 => "1 week".to_string(),
        8..=29 => format!("{} weeks", rounded(days, 7)),
        30 => "1 month".to_string(),
        _ => format!("{} months", rounded(days, 30)),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DEFAULT_EASE_FACTOR, UnitId, WordId};
    use crate::time::fixed_now;

    fn card(repetitions: u32, interval: u32, ease_factor: f64) -> Card {
        let mut card = Card::new(WordId::new("w").unwrap(), UnitId::FIRST, fixed_now(), fixed_now());
        card.repetitions = repetitions;
        card.interval = interval;
        card.ease_factor = ease_factor;
        card
    }

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let s = Scheduler::new();
        for quality in 0..=5 {
            for ease in [MIN_EASE_FACTOR, 1.35, 1.5, DEFAULT_EASE_FACTOR, 3.0] {
                let outcome = s.schedule(&card(3, 10, ease), q(quality), fixed_now());
                assert!(outcome.ease_factor >= MIN_EASE_FACTOR, "q={quality} ease={ease}");
            }
        }
    }

    #[test]
    fn failure_resets_repetitions_and_interval() {
        let s = Scheduler::new();
        for quality in 0..3 {
            let outcome = s.schedule(&card(7, 40, 2.8), q(quality), fixed_now());
            assert_eq!(outcome.repetitions, 0);
            assert_eq!(outcome.interval, 1);
            assert_eq!(outcome.due, fixed_now() + Duration::days(1));
        }
    }

    #[test]
    fn first_and_second_success_intervals() {
        let s = Scheduler::new();
        assert_eq!(s.schedule(&card(0, 0, 2.5), q(3), fixed_now()).interval, 1);
        assert_eq!(s.schedule(&card(1, 1, 2.5), q(4), fixed_now()).interval, 6);
    }

    #[test]
    fn later_success_multiplies_by_updated_ease() {
        let s = Scheduler::new();
        let outcome = s.schedule(&card(2, 6, 2.5), q(5), fixed_now());
        assert!(outcome.ease_factor > 2.5);
        assert_eq!(outcome.interval, (6.0 * outcome.ease_factor).round() as u32);
        assert_eq!(outcome.interval, 16);
    }

    #[test]
    fn perfect_score_counts_double() {
        let s = Scheduler::new();
        assert_eq!(s.schedule(&card(0, 0, 2.5), q(5), fixed_now()).repetitions, 2);
        assert_eq!(s.schedule(&card(0, 0, 2.5), q(4), fixed_now()).repetitions, 1);
        assert_eq!(s.schedule(&card(2, 6, 2.5), q(3), fixed_now()).repetitions, 3);
    }

    #[test]
    fn ease_adjustment_matches_sm2_table() {
        assert!((next_ease_factor(2.5, q(5)) - 2.6).abs() < 1e-9);
        assert!((next_ease_factor(2.5, q(4)) - 2.5).abs() < 1e-9);
        assert!((next_ease_factor(2.5, q(3)) - 2.36).abs() < 1e-9);
        assert!((next_ease_factor(1.4, q(1)) - MIN_EASE_FACTOR).abs() < 1e-9);
    }

    #[test]
    fn corrupt_zero_interval_still_moves_forward() {
        let s = Scheduler::new();
        let outcome = s.schedule(&card(4, 0, 2.5), q(4), fixed_now());
        assert_eq!(outcome.interval, 1);
    }

    #[test]
    fn interval_formatting() {
        assert_eq!(format_interval(1), "1 day");
        assert_eq!(format_interval(3), "3 days");
        assert_eq!(format_interval(7), "1 week");
        assert_eq!(format_interval(15), "2 weeks");
        assert_eq!(format_interval(30), "1 month");
        assert_eq!(format_interval(95), "3 months");
    }
}
