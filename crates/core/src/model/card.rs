use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{UnitId, WordId};
use crate::time::{self, SESSION_WINDOW_MINUTES};

/// Lowest ease factor a card may ever carry.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor given to freshly created cards.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Longest interval a card may carry, about a century.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CardError {
    #[error("ease factor must be finite and >= {MIN_EASE_FACTOR}, got {0}")]
    InvalidEaseFactor(f64),

    #[error("interval of {0} days exceeds {MAX_INTERVAL_DAYS}")]
    IntervalOutOfRange(u32),

    #[error("visible due date is later than the pending true due date for {0}")]
    DueDateInversion(WordId),
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// Per-learner scheduling record for one vocabulary item.
///
/// `next_review` is the date the session layer sees; it may be pulled forward
/// to keep a card in play. `actual_next_review` holds the date computed by the
/// scheduler until the session is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub word_id: WordId,
    pub unit: UnitId,
    /// Creation time; decks written without it read back as the epoch.
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
    pub ease_factor: f64,
    pub interval: u32,
    pub repetitions: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub next_review: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub actual_next_review: Option<DateTime<Utc>>,
    #[serde(default, with = "time::millis_or_zero")]
    pub last_review: Option<DateTime<Utc>>,
}

impl Card {
    /// A never-reviewed card for `word_id`, due at `due_at`.
    #[must_use]
    pub fn new(word_id: WordId, unit: UnitId, added_at: DateTime<Utc>, due_at: DateTime<Utc>) -> Self {
        Self {
            word_id,
            unit,
            added_at,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 0,
            repetitions: 0,
            next_review: due_at,
            actual_next_review: None,
            last_review: None,
        }
    }

    /// Check the structural invariants of a persisted card.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if the ease factor or interval is out of range, or
    /// the visible due date is later than the pending one.
    pub fn validate(&self) -> Result<(), CardError> {
        if !self.ease_factor.is_finite() || self.ease_factor < MIN_EASE_FACTOR {
            return Err(CardError::InvalidEaseFactor(self.ease_factor));
        }
        if self.interval > MAX_INTERVAL_DAYS {
            return Err(CardError::IntervalOutOfRange(self.interval));
        }
        if self
            .actual_next_review
            .is_some_and(|actual| self.next_review > actual)
        {
            return Err(CardError::DueDateInversion(self.word_id.clone()));
        }
        Ok(())
    }

    /// Due once the visible date has passed, unless an abandoned session left
    /// a later true due date behind.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now && self.actual_next_review.is_none_or(|actual| actual <= now)
    }

    /// The date this card will actually come up again.
    #[must_use]
    pub fn effective_due(&self) -> DateTime<Utc> {
        self.actual_next_review.unwrap_or(self.next_review)
    }

    /// True when the session window has passed but the true due date is
    /// still pending.
    #[must_use]
    pub fn has_expired_window(&self, now: DateTime<Utc>) -> bool {
        self.actual_next_review.is_some() && self.next_review <= now
    }

    #[must_use]
    pub fn never_reviewed(&self) -> bool {
        self.repetitions == 0 && self.last_review.is_none()
    }

    /// A card counts towards unit completion once it has a successful recall.
    #[must_use]
    pub fn is_learned(&self) -> bool {
        self.repetitions > 0
    }

    #[must_use]
    pub fn has_pending_due(&self) -> bool {
        self.actual_next_review.is_some()
    }

    /// True when the card can never surface on its own: it was never reviewed
    /// but is not due, or it is due later than its interval allows.
    #[must_use]
    pub fn is_stuck(&self, now: DateTime<Utc>) -> bool {
        if self.is_due(now) {
            return false;
        }
        if self.never_reviewed() {
            return true;
        }
        let horizon = now
            .checked_add_signed(Duration::days(i64::from(self.interval.max(1))))
            .and_then(|t| t.checked_add_signed(Duration::minutes(SESSION_WINDOW_MINUTES)));
        horizon.is_some_and(|horizon| self.effective_due() > horizon)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn card() -> Card {
        Card::new(
            WordId::new("u1-hola").unwrap(),
            UnitId::FIRST,
            fixed_now(),
            fixed_now(),
        )
    }

    #[test]
    fn new_card_has_defaults() {
        let c = card();
        assert_eq!(c.ease_factor, DEFAULT_EASE_FACTOR);
        assert_eq!(c.interval, 0);
        assert_eq!(c.repetitions, 0);
        assert!(c.never_reviewed());
        assert!(c.is_due(fixed_now()));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_rejects_low_ease() {
        let mut c = card();
        c.ease_factor = 1.0;
        assert!(matches!(c.validate(), Err(CardError::InvalidEaseFactor(_))));
        c.ease_factor = f64::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_due_dates() {
        let mut c = card();
        c.next_review = fixed_now() + Duration::days(2);
        c.actual_next_review = Some(fixed_now() + Duration::days(1));
        assert!(matches!(c.validate(), Err(CardError::DueDateInversion(_))));
    }

    #[test]
    fn never_reviewed_future_card_is_stuck() {
        let mut c = card();
        c.next_review = fixed_now() + Duration::days(1);
        assert!(c.is_stuck(fixed_now()));
    }

    #[test]
    fn reviewed_card_on_schedule_is_not_stuck() {
        let mut c = card();
        c.repetitions = 1;
        c.interval = 1;
        c.last_review = Some(fixed_now());
        c.next_review = fixed_now() + Duration::days(1);
        assert!(!c.is_stuck(fixed_now()));

        c.next_review = fixed_now() + Duration::days(40);
        assert!(c.is_stuck(fixed_now()));
    }

    #[test]
    fn validate_rejects_runaway_interval() {
        let mut c = card();
        c.interval = 200_000_000;
        c.repetitions = 3;
        assert_eq!(c.validate(), Err(CardError::IntervalOutOfRange(200_000_000)));
    }

    #[test]
    fn stuck_check_survives_huge_interval() {
        let mut c = card();
        c.interval = u32::MAX;
        c.repetitions = 3;
        c.last_review = Some(fixed_now());
        c.next_review = fixed_now() + Duration::days(2);
        assert!(!c.is_stuck(fixed_now()));
        c.next_review = fixed_now() + Duration::days(1_000_000);
        assert!(!c.is_stuck(fixed_now()));
    }

    #[test]
    fn pending_due_date_outlives_the_window() {
        let mut c = card();
        c.repetitions = 2;
        c.interval = 6;
        c.last_review = Some(fixed_now());
        c.next_review = fixed_now() + Duration::minutes(30);
        c.actual_next_review = Some(fixed_now() + Duration::days(6));

        assert!(!c.is_due(fixed_now()));
        assert!(c.has_expired_window(fixed_now() + Duration::hours(1)));
        assert!(!c.is_due(fixed_now() + Duration::days(3)));
        assert!(c.is_due(fixed_now() + Duration::days(6)));
        assert!(!c.is_stuck(fixed_now() + Duration::hours(1)));
    }

    #[test]
    fn decodes_cards_without_added_at() {
        let json = serde_json::json!({
            "wordId": "u1-hola",
            "unit": 1,
            "easeFactor": 2.6,
            "interval": 6,
            "repetitions": 2,
            "nextReview": fixed_now().timestamp_millis(),
            "lastReview": fixed_now().timestamp_millis(),
        });
        let c: Card = serde_json::from_value(json).unwrap();
        assert_eq!(c.interval, 6);
        assert_eq!(c.added_at, DateTime::<Utc>::default());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn serializes_with_original_field_names() {
        let c = card();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["wordId"], "u1-hola");
        assert_eq!(json["unit"], 1);
        assert_eq!(json["lastReview"], 0);
        assert_eq!(json["nextReview"], fixed_now().timestamp_millis());
        assert!(json.get("actualNextReview").is_none());

        let back: Card = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
