use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use storage::{CardStore, HttpDeckStore, SqliteDeckStore};
use vocab_core::Clock;
use vocab_core::bootstrap::{BootstrapReport, ensure_unit_started};
use vocab_core::model::{Card, LearnerDeck, LearnerId, Rating, UnitId, VocabularyItem, WordId};
use vocab_core::progression::{self, DeckStats, UnitProgress};
use vocab_core::session::{self, Answer, RecordedAnswer, SessionPolicy};

use crate::config::EngineConfig;
use crate::content::{ContentProvider, JsonContentProvider};
use crate::error::{BootstrapError, ContentError, EngineError};
use crate::queue::SessionQueue;

/// A due card joined with its vocabulary item.
#[derive(Debug, Clone, PartialEq)]
pub struct DueWord {
    pub card: Card,
    pub item: VocabularyItem,
}

/// Result of answering the current card of a [`SessionQueue`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueueAnswer {
    pub recorded: RecordedAnswer,
    /// Position within the upcoming cards where a failed card was put back.
    pub requeued_at: Option<usize>,
    /// Cards drawn in when the queue ran dry.
    pub refilled: usize,
}

/// Per-learner study engine.
///
/// Every change is applied to the in-memory deck first and then persisted;
/// persistence failures are logged and kept as a warning. With no learner
/// opened every operation returns an empty or neutral result.
pub struct StudyService {
    clock: Clock,
    store: CardStore,
    content: Arc<dyn ContentProvider>,
    config: EngineConfig,
    policy: SessionPolicy,
    rng: StdRng,
    deck: Option<LearnerDeck>,
    warning: Option<String>,
}

impl StudyService {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: CardStore,
        content: Arc<dyn ContentProvider>,
        config: EngineConfig,
    ) -> Self {
        let policy = SessionPolicy::default().with_completion_bonus(config.completion_bonus_xp);
        Self {
            clock,
            store,
            content,
            config,
            policy,
            rng: StdRng::from_os_rng(),
            deck: None,
            warning: None,
        }
    }

    /// Wire SQLite, the optional remote store and JSON content from `config`.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError` if the local database cannot be opened or
    /// the remote client cannot be built.
    pub async fn connect(config: EngineConfig, clock: Clock) -> Result<Self, BootstrapError> {
        let local = SqliteDeckStore::open(&config.db_url).await?;
        let mut store = CardStore::new(Arc::new(local));
        if let Some(url) = &config.remote_url {
            let remote = HttpDeckStore::new(url.clone(), config.remote_timeout)?;
            store = store.with_remote(Arc::new(remote));
            info!(%url, "remote deck store enabled");
        }
        let content: Arc<dyn ContentProvider> =
            Arc::new(JsonContentProvider::new(config.content_dir.clone()));
        Ok(Self::new(clock, store, content, config))
    }

    /// Use a seeded generator for requeue and shuffle decisions.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn deck(&self) -> Option<&LearnerDeck> {
        self.deck.as_ref()
    }

    #[must_use]
    pub fn learner(&self) -> Option<&LearnerId> {
        self.deck.as_ref().map(LearnerDeck::learner_id)
    }

    /// Take the last non-fatal persistence warning, if any.
    pub fn take_warning(&mut self) -> Option<String> {
        self.warning.take()
    }

    //
    // ─── LEARNER ───────────────────────────────────────────────────────────────
    //

    /// Load (or create) the deck of `learner`. `None` closes the engine.
    ///
    /// A local store that cannot be read degrades to an empty in-memory
    /// deck; the next save will not overwrite a store holding more progress.
    pub async fn open(&mut self, learner: Option<LearnerId>) -> Option<&LearnerDeck> {
        let Some(learner) = learner else {
            self.deck = None;
            return None;
        };

        let now = self.clock.now();
        let mut deck = match self.store.load_or_create(&learner, now).await {
            Ok(deck) => deck,
            Err(e) => {
                warn!(learner = %learner, error = %e, "deck load failed, starting empty");
                self.warning = Some(e.to_string());
                LearnerDeck::new(learner, now)
            }
        };
        let expired = session::expire_session_windows(&mut deck, now);
        if expired > 0 {
            debug!(learner = %deck.learner_id(), expired, "settled abandoned session cards");
        }
        info!(
            learner = %deck.learner_id(),
            cards = deck.cards().len(),
            xp = deck.xp(),
            "deck opened"
        );
        self.deck = Some(deck);
        self.deck.as_ref()
    }

    /// Validate a raw unit number against the configured range.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for 0 or anything above `max_units`.
    pub fn unit(&self, unit: u32) -> Result<UnitId, EngineError> {
        let max = self.config.max_units;
        if unit > max {
            return Err(EngineError::UnknownUnit { unit, max });
        }
        UnitId::new(unit).map_err(|_| EngineError::UnknownUnit { unit, max })
    }

    fn unit_scope(&self, unit: Option<u32>) -> Result<Option<UnitId>, EngineError> {
        unit.map(|u| self.unit(u)).transpose()
    }

    //
    // ─── UNITS ─────────────────────────────────────────────────────────────────
    //

    /// Create missing cards for `unit` and recover stuck ones.
    ///
    /// Content that fails to load or does not arrive within the configured
    /// timeout leaves the deck unchanged.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for an out-of-range unit and
    /// `EngineError::Locked` if the learner may not enter it yet.
    pub async fn start_unit(&mut self, unit: u32) -> Result<BootstrapReport, EngineError> {
        let unit = self.unit(unit)?;
        let Some(deck) = &self.deck else {
            return Ok(BootstrapReport::default());
        };
        if !progression::can_access(unit, deck) {
            return Err(EngineError::Locked(unit));
        }

        let items = match self.fetch_items(unit).await {
            Ok(items) => items,
            Err(e) => {
                warn!(%unit, error = %e, "content unavailable, nothing to start");
                self.warning = Some(e.to_string());
                return Ok(BootstrapReport::default());
            }
        };

        let now = self.clock.now();
        let report = match self.deck.as_mut() {
            Some(deck) => ensure_unit_started(deck, unit, &items, now),
            None => BootstrapReport::default(),
        };
        if report.changed() {
            info!(%unit, created = report.created, recovered = report.recovered, "unit started");
            self.persist().await;
        }
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for an out-of-range unit.
    pub fn can_access(&self, unit: u32) -> Result<bool, EngineError> {
        let unit = self.unit(unit)?;
        Ok(self
            .deck
            .as_ref()
            .is_some_and(|deck| progression::can_access(unit, deck)))
    }

    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for an out-of-range unit.
    pub fn unit_progress(&self, unit: u32) -> Result<Option<UnitProgress>, EngineError> {
        let unit = self.unit(unit)?;
        Ok(self
            .deck
            .as_ref()
            .map(|deck| progression::unit_progress(deck, unit)))
    }

    /// Progress of every configured unit.
    #[must_use]
    pub fn all_unit_progress(&self) -> Vec<UnitProgress> {
        let Some(deck) = &self.deck else {
            return Vec::new();
        };
        (1..=self.config.max_units)
            .filter_map(|u| UnitId::new(u).ok())
            .map(|unit| progression::unit_progress(deck, unit))
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> DeckStats {
        self.deck
            .as_ref()
            .map(progression::deck_stats)
            .unwrap_or_default()
    }

    /// Record `unit` as completed. Returns `true` if it was newly added.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for an out-of-range unit.
    pub async fn mark_unit_completed(&mut self, unit: u32) -> Result<bool, EngineError> {
        let unit = self.unit(unit)?;
        let added = self
            .deck
            .as_mut()
            .is_some_and(|deck| deck.mark_unit_completed(unit));
        if added {
            info!(%unit, "unit marked completed");
            self.persist().await;
        }
        Ok(added)
    }

    //
    // ─── DUE CARDS ─────────────────────────────────────────────────────────────
    //

    /// Due cards of `unit`, or of every unit when `None`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for an out-of-range unit.
    pub fn due_cards(&self, unit: Option<u32>) -> Result<Vec<Card>, EngineError> {
        let scope = self.unit_scope(unit)?;
        let Some(deck) = &self.deck else {
            return Ok(Vec::new());
        };
        let now = self.clock.now();
        Ok(match scope {
            Some(unit) => session::due_cards(deck, unit, now),
            None => session::due_cards_all(deck, now),
        })
    }

    /// Due cards joined with their vocabulary items.
    ///
    /// Cards whose unit content cannot be fetched, or whose item is missing
    /// from it, are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for an out-of-range unit.
    pub async fn due_words(&self, unit: Option<u32>) -> Result<Vec<DueWord>, EngineError> {
        let cards = self.due_cards(unit)?;
        if cards.is_empty() {
            return Ok(Vec::new());
        }

        let units: BTreeSet<UnitId> = cards.iter().map(|c| c.unit).collect();
        let mut items: BTreeMap<WordId, VocabularyItem> = BTreeMap::new();
        for unit in units {
            match self.fetch_items(unit).await {
                Ok(unit_items) => {
                    items.extend(unit_items.into_iter().map(|item| (item.id.clone(), item)));
                }
                Err(e) => warn!(%unit, error = %e, "content unavailable"),
            }
        }

        let mut words = Vec::with_capacity(cards.len());
        for card in cards {
            match items.get(&card.word_id) {
                Some(item) => words.push(DueWord {
                    item: item.clone(),
                    card,
                }),
                None => warn!(word = %card.word_id, unit = %card.unit, "no content for due card"),
            }
        }
        Ok(words)
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Apply one answer and persist. `Ok(None)` when no learner is open.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Session` if the word has no card in the deck.
    pub async fn record_answer(&mut self, answer: &Answer) -> Result<Option<RecordedAnswer>, EngineError> {
        let now = self.clock.now();
        let Some(deck) = self.deck.as_mut() else {
            return Ok(None);
        };
        let recorded = self.policy.record_answer(deck, answer, now)?;
        debug!(
            word = %recorded.word_id,
            quality = answer.quality.value(),
            interval = recorded.outcome.interval,
            "answer recorded"
        );
        if let Some(unit) = recorded.completed_unit {
            info!(%unit, "unit completed");
        }
        self.persist().await;
        Ok(Some(recorded))
    }

    /// Shorthand for a rating-button answer kept in session.
    ///
    /// # Errors
    ///
    /// See [`Self::record_answer`].
    pub async fn answer(&mut self, word_id: WordId, rating: Rating) -> Result<Option<RecordedAnswer>, EngineError> {
        self.record_answer(&Answer::from_rating(word_id, rating)).await
    }

    /// Build a draw queue from the currently due cards.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for an out-of-range unit.
    pub fn session_queue(&mut self, unit: Option<u32>, shuffle: bool) -> Result<SessionQueue, EngineError> {
        let cards = self.due_cards(unit)?;
        Ok(if shuffle {
            SessionQueue::shuffled(&cards, &mut self.rng)
        } else {
            SessionQueue::new(&cards)
        })
    }

    /// Answer the queue's current card.
    ///
    /// A failed card is put back a few positions later; a passed card is
    /// left behind. When the queue runs dry it is refilled from the cards
    /// due now within `unit`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for an out-of-range unit, or
    /// `EngineError::Session` if the current word has no card.
    pub async fn answer_current(
        &mut self,
        queue: &mut SessionQueue,
        unit: Option<u32>,
        rating: Rating,
    ) -> Result<Option<QueueAnswer>, EngineError> {
        let scope = self.unit_scope(unit)?;
        let Some(word_id) = queue.current().cloned() else {
            return Ok(None);
        };
        let answer = Answer::from_rating(word_id, rating);
        let Some(recorded) = self.record_answer(&answer).await? else {
            return Ok(None);
        };

        let requeued_at = if answer.quality.is_success() {
            queue.advance();
            None
        } else {
            queue.requeue_current(&mut self.rng)
        };

        let mut refilled = 0;
        if queue.is_exhausted() {
            let cards = self.due_cards(scope.map(|u| u.value()))?;
            refilled = cards.len();
            queue.refill(&cards);
        }

        Ok(Some(QueueAnswer {
            recorded,
            requeued_at,
            refilled,
        }))
    }

    /// Move stashed due dates into place, for `unit` or for every unit.
    /// Returns how many cards changed.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownUnit` for an out-of-range unit.
    pub async fn finalize_session(&mut self, unit: Option<u32>) -> Result<usize, EngineError> {
        let scope = self.unit_scope(unit)?;
        let changed = self
            .deck
            .as_mut()
            .map_or(0, |deck| session::finalize_session(deck, scope));
        if changed > 0 {
            info!(changed, "session finalized");
            self.persist().await;
        }
        Ok(changed)
    }

    /// Delete the learner's deck everywhere and start over.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if the local store cannot be cleared.
    pub async fn reset(&mut self) -> Result<(), EngineError> {
        let Some(learner) = self.learner().cloned() else {
            return Ok(());
        };
        if let Some(remote_error) = self.store.reset(&learner).await? {
            self.warning = Some(remote_error.to_string());
        }
        self.deck = Some(LearnerDeck::new(learner, self.clock.now()));
        Ok(())
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    async fn fetch_items(&self, unit: UnitId) -> Result<Vec<VocabularyItem>, ContentError> {
        let fetch = self.content.unit_items(unit);
        tokio::time::timeout(self.config.content_timeout, fetch)
            .await
            .map_err(|_| ContentError::Timeout(unit))?
    }

    async fn persist(&mut self) {
        let now = self.clock.now();
        let result = match self.deck.as_mut() {
            Some(deck) => {
                deck.touch(now);
                self.store.save(deck).await
            }
            None => return,
        };

        match result {
            Ok(outcome) => {
                if let Some(e) = outcome.remote_error {
                    self.warning = Some(e.to_string());
                }
                if outcome.adopted_local {
                    self.deck = Some(outcome.deck);
                }
            }
            Err(e) => {
                warn!(learner = ?self.learner(), error = %e, "deck save failed, keeping in-memory state");
                self.warning = Some(e.to_string());
            }
        }
    }
}
