use rand::Rng;
use rand::seq::SliceRandom;

use vocab_core::model::{Card, WordId};

/// Failed cards come back this many positions later, at least.
pub const REQUEUE_MIN_OFFSET: usize = 2;
/// Failed cards come back this many positions later, at most.
pub const REQUEUE_MAX_OFFSET: usize = 4;

/// Aggregated view of queue progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueProgress {
    pub answered: usize,
    pub remaining: usize,
    pub requeued: usize,
}

/// Draw order for one sitting.
///
/// Holds word ids only; card state lives in the deck.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQueue {
    order: Vec<WordId>,
    current: usize,
    answered: usize,
    requeued: usize,
}

impl SessionQueue {
    /// Queue in the given card order.
    #[must_use]
    pub fn new(cards: &[Card]) -> Self {
        Self {
            order: cards.iter().map(|c| c.word_id.clone()).collect(),
            ..Self::default()
        }
    }

    /// Queue in random order.
    #[must_use]
    pub fn shuffled<R: Rng + ?Sized>(cards: &[Card], rng: &mut R) -> Self {
        let mut queue = Self::new(cards);
        queue.order.shuffle(rng);
        queue
    }

    #[must_use]
    pub fn current(&self) -> Option<&WordId> {
        self.order.get(self.current)
    }

    /// Words still to be drawn, current first.
    #[must_use]
    pub fn upcoming(&self) -> &[WordId] {
        self.order.get(self.current..).unwrap_or(&[])
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.order.len().saturating_sub(self.current)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    #[must_use]
    pub fn progress(&self) -> QueueProgress {
        QueueProgress {
            answered: self.answered,
            remaining: self.remaining(),
            requeued: self.requeued,
        }
    }

    /// Move past the current card. Returns the new current card.
    pub fn advance(&mut self) -> Option<&WordId> {
        if self.current < self.order.len() {
            self.current += 1;
            self.answered += 1;
        }
        self.current()
    }

    /// Put the current card back 2 to 4 positions later, or at the end if
    /// fewer cards remain. Returns the index it landed on within
    /// [`Self::upcoming`].
    pub fn requeue_current<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.current >= self.order.len() {
            return None;
        }
        let word = self.order.remove(self.current);
        let offset = rng.random_range(REQUEUE_MIN_OFFSET..=REQUEUE_MAX_OFFSET);
        let at = (self.current + offset).min(self.order.len());
        self.order.insert(at, word);
        self.answered += 1;
        self.requeued += 1;
        Some(at - self.current)
    }

    /// Reorder the upcoming cards.
    ///
    /// Words listed in `order` come first in that order; upcoming words not
    /// listed keep their relative order after them. Unknown words are ignored.
    pub fn reorder(&mut self, order: &[WordId]) {
        let mut rest: Vec<WordId> = self.order.split_off(self.current);
        let mut front = Vec::with_capacity(rest.len());
        for word in order {
            if let Some(pos) = rest.iter().position(|w| w == word) {
                front.push(rest.remove(pos));
            }
        }
        self.order.extend(front);
        self.order.append(&mut rest);
    }

    /// Replace the upcoming cards with a fresh draw, keeping the counters.
    pub fn refill(&mut self, cards: &[Card]) {
        self.order.truncate(self.current);
        self.order.extend(cards.iter().map(|c| c.word_id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use vocab_core::model::UnitId;
    use vocab_core::time::fixed_now;

    fn cards(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| {
                Card::new(
                    WordId::new(format!("w{i}")).unwrap(),
                    UnitId::FIRST,
                    fixed_now(),
                    fixed_now(),
                )
            })
            .collect()
    }

    fn word(i: usize) -> WordId {
        WordId::new(format!("w{i}")).unwrap()
    }

    #[test]
    fn advances_through_cards() {
        let mut q = SessionQueue::new(&cards(2));
        assert_eq!(q.current(), Some(&word(0)));
        assert_eq!(q.advance(), Some(&word(1)));
        assert_eq!(q.advance(), None);
        assert!(q.is_exhausted());
        assert_eq!(q.progress().answered, 2);
        assert_eq!(q.advance(), None);
        assert_eq!(q.progress().answered, 2);
    }

    #[test]
    fn requeue_lands_two_to_four_later() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut q = SessionQueue::new(&cards(10));
            let at = q.requeue_current(&mut rng).unwrap();
            assert!((REQUEUE_MIN_OFFSET..=REQUEUE_MAX_OFFSET).contains(&at));
            assert_eq!(q.upcoming()[at], word(0));
            assert_eq!(q.current(), Some(&word(1)));
            assert_eq!(q.remaining(), 10);
        }
    }

    #[test]
    fn requeue_clamps_to_end() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut q = SessionQueue::new(&cards(2));
        q.advance();
        let at = q.requeue_current(&mut rng).unwrap();
        assert_eq!(at, 0);
        assert_eq!(q.current(), Some(&word(1)));

        let mut single = SessionQueue::new(&cards(1));
        assert_eq!(single.requeue_current(&mut rng), Some(0));
        assert_eq!(single.current(), Some(&word(0)));
        assert_eq!(single.progress().requeued, 1);
    }

    #[test]
    fn requeue_on_empty_queue_is_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut q = SessionQueue::new(&[]);
        assert_eq!(q.requeue_current(&mut rng), None);
    }

    #[test]
    fn reorder_moves_listed_words_first() {
        let mut q = SessionQueue::new(&cards(5));
        q.advance();
        q.reorder(&[word(4), word(0), word(2), WordId::new("nope").unwrap()]);
        assert_eq!(q.upcoming(), &[word(4), word(2), word(1), word(3)]);
        assert_eq!(q.progress().answered, 1);
    }

    #[test]
    fn shuffle_keeps_every_card() {
        let mut rng = StdRng::seed_from_u64(42);
        let q = SessionQueue::shuffled(&cards(8), &mut rng);
        let mut seen: Vec<_> = q.upcoming().to_vec();
        seen.sort();
        let mut expected: Vec<_> = (0..8).map(word).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn refill_keeps_counters() {
        let mut q = SessionQueue::new(&cards(1));
        q.advance();
        q.refill(&cards(3));
        assert_eq!(q.remaining(), 3);
        assert_eq!(q.progress().answered, 1);
    }
}
