//! Unit gating and progress reporting derived from a deck.

use std::collections::BTreeMap;

use crate::model::{Card, LearnerDeck, UnitId};

/// Cards with an interval at least this long count as mastered.
pub const MASTERED_INTERVAL_DAYS: u32 = 30;

/// Whether the learner may enter `unit`.
///
/// - Unit 1 is always open.
/// - Unit N opens once unit N-1 is in `completed_units`, or once every card
///   of unit N-1 has been learned.
/// - No unit more than one past the highest unit holding cards is ever open.
#[must_use]
pub fn can_access(unit: UnitId, deck: &LearnerDeck) -> bool {
    let Some(previous) = unit.previous() else {
        return true;
    };

    let highest = deck.highest_started_unit().map_or(0, |u| u.value());
    if unit.value() > highest.saturating_add(1) {
        return false;
    }

    deck.is_unit_completed(previous) || unit_fully_learned(deck, previous)
}

/// True if `unit` has cards and all of them are learned.
#[must_use]
pub fn unit_fully_learned(deck: &LearnerDeck, unit: UnitId) -> bool {
    let mut cards = deck.cards_in_unit(unit).peekable();
    cards.peek().is_some() && cards.all(Card::is_learned)
}

//
// ─── UNIT PROGRESS ─────────────────────────────────────────────────────────────
//

/// Progress snapshot of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitProgress {
    pub unit: UnitId,
    pub is_started: bool,
    pub completed_words: usize,
    pub total_words: usize,
    pub completion_rate: f64,
    pub average_repetitions: f64,
    pub average_ease_factor: f64,
    /// Share of the previous unit already learned; 1.0 once it is completed.
    pub previous_unit_completion: f64,
    pub is_completed: bool,
    pub can_access: bool,
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn unit_progress(deck: &LearnerDeck, unit: UnitId) -> UnitProgress {
    let cards: Vec<&Card> = deck.cards_in_unit(unit).collect();
    let total_words = cards.len();
    let completed_words = cards.iter().filter(|c| c.is_learned()).count();

    let average = |sum: f64| {
        if total_words == 0 {
            0.0
        } else {
            sum / total_words as f64
        }
    };

    let previous_unit_completion = match unit.previous() {
        None => 1.0,
        Some(prev) if deck.is_unit_completed(prev) => 1.0,
        Some(prev) => learned_share(deck, prev),
    };

    UnitProgress {
        unit,
        is_started: total_words > 0,
        completed_words,
        total_words,
        completion_rate: average(completed_words as f64),
        average_repetitions: average(cards.iter().map(|c| f64::from(c.repetitions)).sum()),
        average_ease_factor: average(cards.iter().map(|c| c.ease_factor).sum()),
        previous_unit_completion,
        is_completed: deck.is_unit_completed(unit),
        can_access: can_access(unit, deck),
    }
}

#[allow(clippy::cast_precision_loss)]
fn learned_share(deck: &LearnerDeck, unit: UnitId) -> f64 {
    let (learned, total) = deck
        .cards_in_unit(unit)
        .fold((0usize, 0usize), |(l, t), c| (l + usize::from(c.is_learned()), t + 1));
    if total == 0 {
        0.0
    } else {
        learned as f64 / total as f64
    }
}

//
// ─── DECK STATS ────────────────────────────────────────────────────────────────
//

/// Whole-deck statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeckStats {
    pub total_cards: usize,
    pub completed_cards: usize,
    pub cards_per_unit: BTreeMap<UnitId, usize>,
    /// Sum of current repetition counts.
    pub total_reviews: u64,
    pub mastered_cards: usize,
    pub xp: u64,
}

#[must_use]
pub fn deck_stats(deck: &LearnerDeck) -> DeckStats {
    let mut stats = DeckStats {
        total_cards: deck.cards().len(),
        xp: deck.xp(),
        ..DeckStats::default()
    };
    for card in deck.cards() {
        *stats.cards_per_unit.entry(card.unit).or_default() += 1;
        stats.total_reviews += u64::from(card.repetitions);
        if card.is_learned() {
            stats.completed_cards += 1;
        }
        if card.interval >= MASTERED_INTERVAL_DAYS {
            stats.mastered_cards += 1;
        }
    }
    stats
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::ensure_unit_started;
    use crate::model::{LearnerId, Rating, VocabularyItem, WordId};
    use crate::session::{Answer, SessionPolicy};
    use crate::time::fixed_now;

    fn unit(n: u32) -> UnitId {
        UnitId::new(n).unwrap()
    }

    fn items(prefix: &str, n: usize) -> Vec<VocabularyItem> {
        (0..n)
            .map(|i| VocabularyItem {
                id: WordId::new(format!("{prefix}-{i}")).unwrap(),
                source: String::new(),
                target: String::new(),
                hint: None,
                image_path: None,
            })
            .collect()
    }

    fn deck() -> LearnerDeck {
        LearnerDeck::new(LearnerId::new("learner").unwrap(), fixed_now())
    }

    fn learn_all(deck: &mut LearnerDeck, unit: UnitId) {
        let words: Vec<WordId> = deck.cards_in_unit(unit).map(|c| c.word_id.clone()).collect();
        for w in words {
            SessionPolicy::default()
                .record_answer(deck, &Answer::from_rating(w, Rating::GotOne), fixed_now())
                .unwrap();
        }
    }

    #[test]
    fn unit_one_is_always_open() {
        assert!(can_access(UnitId::FIRST, &deck()));
        let mut d = deck();
        ensure_unit_started(&mut d, unit(1), &items("u1", 3), fixed_now());
        assert!(can_access(UnitId::FIRST, &d));
    }

    #[test]
    fn unit_two_opens_when_unit_one_is_learned() {
        let mut d = deck();
        ensure_unit_started(&mut d, unit(1), &items("u1", 3), fixed_now());
        assert!(!can_access(unit(2), &d));

        learn_all(&mut d, unit(1));
        assert!(can_access(unit(2), &d));
    }

    #[test]
    fn learned_cards_open_next_unit_without_completed_entry() {
        let mut d = deck();
        ensure_unit_started(&mut d, unit(1), &items("u1", 2), fixed_now());
        // learn cards by editing state directly, bypassing completion tracking
        for card in d.cards_mut() {
            card.repetitions = 1;
        }
        assert!(!d.is_unit_completed(unit(1)));
        assert!(can_access(unit(2), &d));
    }

    #[test]
    fn completed_entry_opens_next_unit() {
        let mut d = deck();
        ensure_unit_started(&mut d, unit(1), &items("u1", 2), fixed_now());
        d.mark_unit_completed(unit(1));
        assert!(can_access(unit(2), &d));
    }

    #[test]
    fn cannot_skip_more_than_one_unit_ahead() {
        let mut d = deck();
        ensure_unit_started(&mut d, unit(1), &items("u1", 1), fixed_now());
        learn_all(&mut d, unit(1));
        d.mark_unit_completed(unit(2));
        assert!(can_access(unit(2), &d));
        assert!(!can_access(unit(3), &d));
    }

    #[test]
    fn empty_previous_unit_keeps_gate_closed() {
        let mut d = deck();
        ensure_unit_started(&mut d, unit(1), &items("u1", 1), fixed_now());
        learn_all(&mut d, unit(1));
        ensure_unit_started(&mut d, unit(2), &items("u2", 1), fixed_now());
        assert!(!can_access(unit(3), &d));
    }

    #[test]
    fn unit_progress_reports_rates() {
        let mut d = deck();
        ensure_unit_started(&mut d, unit(1), &items("u1", 4), fixed_now());
        let first = d.cards()[0].word_id.clone();
        SessionPolicy::default()
            .record_answer(&mut d, &Answer::from_rating(first, Rating::GotBoth), fixed_now())
            .unwrap();

        let p = unit_progress(&d, unit(1));
        assert!(p.is_started);
        assert_eq!(p.total_words, 4);
        assert_eq!(p.completed_words, 1);
        assert!((p.completion_rate - 0.25).abs() < 1e-9);
        assert!((p.average_repetitions - 0.5).abs() < 1e-9);
        assert!(p.can_access);

        let next = unit_progress(&d, unit(2));
        assert!(!next.is_started);
        assert!((next.previous_unit_completion - 0.25).abs() < 1e-9);
        assert!(!next.can_access);
    }

    #[test]
    fn deck_stats_counts() {
        let mut d = deck();
        ensure_unit_started(&mut d, unit(1), &items("u1", 2), fixed_now());
        learn_all(&mut d, unit(1));
        ensure_unit_started(&mut d, unit(2), &items("u2", 3), fixed_now());
        for card in d.cards_mut().take(1) {
            card.interval = 45;
        }

        let stats = deck_stats(&d);
        assert_eq!(stats.total_cards, 5);
        assert_eq!(stats.completed_cards, 2);
        assert_eq!(stats.cards_per_unit.get(&unit(2)), Some(&3));
        assert_eq!(stats.total_reviews, 2);
        assert_eq!(stats.mastered_cards, 1);
        assert_eq!(stats.xp, 6);
    }
}
