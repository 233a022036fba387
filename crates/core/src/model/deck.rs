use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::card::{Card, CardError};
use crate::model::ids::{LearnerId, UnitId, WordId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("duplicate card for word {0}")]
    DuplicateCard(WordId),

    #[error("deck belongs to {found}, expected {expected}")]
    LearnerMismatch { expected: LearnerId, found: LearnerId },

    #[error(transparent)]
    Card(#[from] CardError),
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Monotonic progress signals used to settle write conflicts.
///
/// Ordered lexicographically by XP, then card count, then completed units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeckProgress {
    pub xp: u64,
    pub cards: usize,
    pub completed_units: usize,
}

//
// ─── LEARNER DECK ──────────────────────────────────────────────────────────────
//

/// All scheduling state for one learner.
///
/// Holds at most one card per word; `completed_units` only ever grows and
/// `xp` only ever increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerDeck {
    #[serde(alias = "userId")]
    learner_id: LearnerId,
    cards: Vec<Card>,
    #[serde(default)]
    xp: u64,
    #[serde(default)]
    completed_units: BTreeSet<UnitId>,
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    last_synced_at: DateTime<Utc>,
}

impl LearnerDeck {
    /// An empty deck for a learner seen for the first time.
    #[must_use]
    pub fn new(learner_id: LearnerId, now: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            cards: Vec::new(),
            xp: 0,
            completed_units: BTreeSet::new(),
            last_synced_at: now,
        }
    }

    /// Check structural invariants of a deck read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::DuplicateCard` if a word appears twice, or
    /// `DeckError::Card` if any card fails its own validation.
    pub fn validate(&self) -> Result<(), DeckError> {
        let mut seen = HashSet::with_capacity(self.cards.len());
        for card in &self.cards {
            card.validate()?;
            if !seen.insert(&card.word_id) {
                return Err(DeckError::DuplicateCard(card.word_id.clone()));
            }
        }
        Ok(())
    }

    /// Validate and additionally check the deck belongs to `learner_id`.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::LearnerMismatch` or any error from [`Self::validate`].
    pub fn validate_for(&self, learner_id: &LearnerId) -> Result<(), DeckError> {
        if &self.learner_id != learner_id {
            return Err(DeckError::LearnerMismatch {
                expected: learner_id.clone(),
                found: self.learner_id.clone(),
            });
        }
        self.validate()
    }

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn xp(&self) -> u64 {
        self.xp
    }

    #[must_use]
    pub fn completed_units(&self) -> &BTreeSet<UnitId> {
        &self.completed_units
    }

    #[must_use]
    pub fn last_synced_at(&self) -> DateTime<Utc> {
        self.last_synced_at
    }

    #[must_use]
    pub fn is_unit_completed(&self, unit: UnitId) -> bool {
        self.completed_units.contains(&unit)
    }

    #[must_use]
    pub fn card(&self, word_id: &WordId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.word_id == word_id)
    }

    pub(crate) fn card_mut(&mut self, word_id: &WordId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| &c.word_id == word_id)
    }

    pub(crate) fn cards_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.cards.iter_mut()
    }

    pub fn cards_in_unit(&self, unit: UnitId) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(move |c| c.unit == unit)
    }

    #[must_use]
    pub fn has_started_unit(&self, unit: UnitId) -> bool {
        self.cards.iter().any(|c| c.unit == unit)
    }

    /// Highest unit with at least one card, if any.
    #[must_use]
    pub fn highest_started_unit(&self) -> Option<UnitId> {
        self.cards.iter().map(|c| c.unit).max()
    }

    /// Append a card unless its word is already present. Returns whether it was added.
    pub(crate) fn insert_card(&mut self, card: Card) -> bool {
        if self.card(&card.word_id).is_some() {
            return false;
        }
        self.cards.push(card);
        true
    }

    pub(crate) fn add_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(u64::from(amount));
    }

    /// Record a unit as completed. Returns `true` if it was newly added.
    pub fn mark_unit_completed(&mut self, unit: UnitId) -> bool {
        self.completed_units.insert(unit)
    }

    /// Stamp the deck as persisted at `at`.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_synced_at = at;
    }

    #[must_use]
    pub fn progress(&self) -> DeckProgress {
        DeckProgress {
            xp: self.xp,
            cards: self.cards.len(),
            completed_units: self.completed_units.len(),
        }
    }

    /// True if `self` carries strictly more progress than `other`.
    #[must_use]
    pub fn shows_more_progress_than(&self, other: &LearnerDeck) -> bool {
        self.progress().cmp(&other.progress()) == Ordering::Greater
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn learner() -> LearnerId {
        LearnerId::new("0xlearner").unwrap()
    }

    fn card(word: &str, unit: u32) -> Card {
        Card::new(
            WordId::new(word).unwrap(),
            UnitId::new(unit).unwrap(),
            fixed_now(),
            fixed_now(),
        )
    }

    #[test]
    fn new_deck_is_empty() {
        let deck = LearnerDeck::new(learner(), fixed_now());
        assert!(deck.cards().is_empty());
        assert_eq!(deck.xp(), 0);
        assert!(deck.completed_units().is_empty());
        assert_eq!(deck.highest_started_unit(), None);
    }

    #[test]
    fn insert_card_keeps_words_unique() {
        let mut deck = LearnerDeck::new(learner(), fixed_now());
        assert!(deck.insert_card(card("a", 1)));
        assert!(!deck.insert_card(card("a", 2)));
        assert_eq!(deck.cards().len(), 1);
        assert!(deck.validate().is_ok());
    }

    #[test]
    fn validate_detects_duplicates_from_storage() {
        let mut deck = LearnerDeck::new(learner(), fixed_now());
        deck.cards.push(card("a", 1));
        deck.cards.push(card("a", 1));
        assert!(matches!(deck.validate(), Err(DeckError::DuplicateCard(_))));
    }

    #[test]
    fn validate_for_checks_owner() {
        let deck = LearnerDeck::new(learner(), fixed_now());
        let other = LearnerId::new("someone-else").unwrap();
        assert!(matches!(
            deck.validate_for(&other),
            Err(DeckError::LearnerMismatch { .. })
        ));
    }

    #[test]
    fn progress_ordering_prefers_xp() {
        let mut ahead = LearnerDeck::new(learner(), fixed_now());
        ahead.add_xp(120);
        let mut behind = LearnerDeck::new(learner(), fixed_now());
        behind.add_xp(50);
        behind.insert_card(card("a", 1));
        assert!(ahead.shows_more_progress_than(&behind));
        assert!(!behind.shows_more_progress_than(&ahead));
        assert!(!ahead.shows_more_progress_than(&ahead.clone()));
    }

    #[test]
    fn completed_units_are_idempotent() {
        let mut deck = LearnerDeck::new(learner(), fixed_now());
        assert!(deck.mark_unit_completed(UnitId::FIRST));
        assert!(!deck.mark_unit_completed(UnitId::FIRST));
        assert_eq!(deck.completed_units().len(), 1);
    }

    #[test]
    fn json_shape_matches_stored_decks() {
        let json = serde_json::json!({
            "userId": "0xlearner",
            "cards": [{
                "wordId": "u1-hola",
                "addedAt": 1_700_000_000_000_i64,
                "unit": 1,
                "easeFactor": 2.5,
                "interval": 0,
                "repetitions": 0,
                "nextReview": 1_700_000_000_000_i64,
                "lastReview": 0
            }],
            "lastSyncedAt": 1_700_000_000_000_i64,
            "xp": 7,
            "completedUnits": [1]
        });
        let deck: LearnerDeck = serde_json::from_value(json).unwrap();
        assert_eq!(deck.learner_id(), &learner());
        assert_eq!(deck.xp(), 7);
        assert!(deck.is_unit_completed(UnitId::FIRST));
        assert!(deck.cards()[0].last_review.is_none());
    }
}
