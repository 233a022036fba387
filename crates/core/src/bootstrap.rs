//! First-visit materialization of a unit's cards.

use chrono::{DateTime, Utc};

use crate::model::{Card, LearnerDeck, UnitId, VocabularyItem};
use crate::time::recovery_due_at;

/// What [`ensure_unit_started`] did to the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootstrapReport {
    /// Cards created for items that had none.
    pub created: usize,
    /// Existing cards that could never surface and were made due again.
    pub recovered: usize,
}

impl BootstrapReport {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.created > 0 || self.recovered > 0
    }
}

/// Make sure every item of `unit` has a card, and that none of the unit's
/// existing cards is stuck out of reach.
///
/// New cards start with the default ease, no interval, no repetitions and a
/// due date slightly in the past so they can be drawn immediately. Words that
/// already have a card (in any unit) are left alone.
pub fn ensure_unit_started(
    deck: &mut LearnerDeck,
    unit: UnitId,
    items: &[VocabularyItem],
    now: DateTime<Utc>,
) -> BootstrapReport {
    let due_at = recovery_due_at(now);
    let mut report = BootstrapReport::default();

    for card in deck.cards_mut().filter(|c| c.unit == unit) {
        if card.is_stuck(now) {
            card.next_review = due_at;
            card.actual_next_review = None;
            report.recovered += 1;
        }
    }

    for item in items {
        if deck.insert_card(Card::new(item.id.clone(), unit, now, due_at)) {
            report.created += 1;
        }
    }

    report
}
