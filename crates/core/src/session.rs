//! In-session due selection, answer recording and finalization.
//!
//! A card answered during a session keeps a visible due date inside the
//! session window while its real due date waits in `actual_next_review`.
//! [`finalize_session`] swaps the real dates in.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Card, LearnerDeck, Quality, Rating, UnitId, WordId};
use crate::scheduler::{ScheduleOutcome, Scheduler};
use crate::time::session_window_end;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionOpError {
    #[error("no card for word {0} in this deck")]
    UnknownWord(WordId),
}

//
// ─── DUE SELECTION ─────────────────────────────────────────────────────────────
//

/// Cards of `unit` due at `now`, in deck order.
///
/// A unit whose cards have never been reviewed is entirely due, whatever
/// their timestamps say.
#[must_use]
pub fn due_cards(deck: &LearnerDeck, unit: UnitId, now: DateTime<Utc>) -> Vec<Card> {
    let unit_cards: Vec<&Card> = deck.cards_in_unit(unit).collect();
    if !unit_cards.is_empty() && unit_cards.iter().all(|c| c.never_reviewed()) {
        return unit_cards.into_iter().cloned().collect();
    }
    unit_cards
        .into_iter()
        .filter(|c| c.is_due(now))
        .cloned()
        .collect()
}

/// Due cards across every unit, in deck order.
#[must_use]
pub fn due_cards_all(deck: &LearnerDeck, now: DateTime<Utc>) -> Vec<Card> {
    let mut units: Vec<UnitId> = deck.cards().iter().map(|c| c.unit).collect();
    units.sort_unstable();
    units.dedup();

    let mut due: Vec<Card> = units
        .into_iter()
        .flat_map(|unit| due_cards(deck, unit, now))
        .collect();
    let position = |word: &WordId| deck.cards().iter().position(|c| &c.word_id == word);
    due.sort_by_key(|c| position(&c.word_id));
    due
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// One learner answer to apply to a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub word_id: WordId,
    pub quality: Quality,
    pub xp_award: u32,
    /// Keep the card visible for the rest of the session instead of moving
    /// it straight to its real due date.
    pub keep_in_session: bool,
}

impl Answer {
    /// Answer from a rating button, kept in session.
    #[must_use]
    pub fn from_rating(word_id: WordId, rating: Rating) -> Self {
        Self {
            word_id,
            quality: rating.quality(),
            xp_award: rating.xp(),
            keep_in_session: true,
        }
    }

    #[must_use]
    pub fn final_answer(mut self) -> Self {
        self.keep_in_session = false;
        self
    }
}

/// What recording an answer changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAnswer {
    pub word_id: WordId,
    pub unit: UnitId,
    pub outcome: ScheduleOutcome,
    /// Set when this answer was the last card of its unit to be learned.
    pub completed_unit: Option<UnitId>,
    pub xp_awarded: u32,
}

/// Scheduling rules applied by [`SessionPolicy::record_answer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionPolicy {
    pub scheduler: Scheduler,
    /// Extra XP granted when an answer completes a unit.
    pub completion_bonus_xp: u32,
}

impl SessionPolicy {
    #[must_use]
    pub fn with_completion_bonus(mut self, xp: u32) -> Self {
        self.completion_bonus_xp = xp;
        self
    }

    /// Schedule the answered card, award XP and detect unit completion.
    ///
    /// Completion is judged on the post-answer state: every other card of the
    /// unit must already be learned and this answer must leave the card
    /// learned too.
    ///
    /// # Errors
    ///
    /// Returns `SessionOpError::UnknownWord` if the deck has no such card;
    /// the deck is left untouched.
    pub fn record_answer(
        &self,
        deck: &mut LearnerDeck,
        answer: &Answer,
        now: DateTime<Utc>,
    ) -> Result<RecordedAnswer, SessionOpError> {
        let card = deck
            .card(&answer.word_id)
            .ok_or_else(|| SessionOpError::UnknownWord(answer.word_id.clone()))?;
        let unit = card.unit;
        let outcome = self.scheduler.schedule(card, answer.quality, now);

        let others_learned = deck
            .cards_in_unit(unit)
            .filter(|c| c.word_id != answer.word_id)
            .all(Card::is_learned);
        let completes_unit =
            others_learned && outcome.repetitions > 0 && !deck.is_unit_completed(unit);

        if let Some(card) = deck.card_mut(&answer.word_id) {
            card.ease_factor = outcome.ease_factor;
            card.interval = outcome.interval;
            card.repetitions = outcome.repetitions;
            card.last_review = Some(now);
            if answer.keep_in_session {
                card.next_review = session_window_end(now).min(outcome.due);
                card.actual_next_review = Some(outcome.due);
            } else {
                card.next_review = outcome.due;
                card.actual_next_review = None;
            }
        }

        let mut xp_awarded = answer.xp_award;
        if completes_unit {
            deck.mark_unit_completed(unit);
            xp_awarded = xp_awarded.saturating_add(self.completion_bonus_xp);
        }
        deck.add_xp(xp_awarded);

        Ok(RecordedAnswer {
            word_id: answer.word_id.clone(),
            unit,
            outcome,
            completed_unit: completes_unit.then_some(unit),
            xp_awarded,
        })
    }
}

//
// ─── FINALIZE ──────────────────────────────────────────────────────────────────
//

/// Settle cards left behind by an abandoned session.
///
/// Every card whose session window has passed gets its pending true due date
/// moved into `next_review`. Cards still inside their window are untouched.
/// Returns how many cards changed.
pub fn expire_session_windows(deck: &mut LearnerDeck, now: DateTime<Utc>) -> usize {
    let mut changed = 0;
    for card in deck.cards_mut() {
        if !card.has_expired_window(now) {
            continue;
        }
        if let Some(actual) = card.actual_next_review.take() {
            card.next_review = actual;
            changed += 1;
        }
    }
    changed
}

/// Move pending true due dates into `next_review`, optionally for one unit.
///
/// Returns how many cards changed; a second call with no answers in between
/// returns 0.
pub fn finalize_session(deck: &mut LearnerDeck, unit: Option<UnitId>) -> usize {
    let mut changed = 0;
    for card in deck.cards_mut() {
        if unit.is_some_and(|u| card.unit != u) {
            continue;
        }
        if let Some(actual) = card.actual_next_review.take() {
            card.next_review = actual;
            changed += 1;
        }
    }
    changed
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
