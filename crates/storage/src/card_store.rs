//! Local-first deck persistence with an optional remote mirror.
//!
//! Reads prefer the local copy. Writes go local first, then remote; a remote
//! failure never undoes the local write. Before writing, the deck about to
//! be stored is compared with the local copy and whichever shows more
//! progress wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use vocab_core::model::{LearnerDeck, LearnerId};

use crate::repository::{DeckBackend, StorageError};

/// Result of [`CardStore::save`].
#[derive(Debug)]
pub struct SaveOutcome {
    /// The deck that is now authoritative.
    pub deck: LearnerDeck,
    /// True if the local copy showed more progress and was kept instead.
    pub adopted_local: bool,
    /// Remote write failure, reported as a warning.
    pub remote_error: Option<StorageError>,
}

#[derive(Clone)]
pub struct CardStore {
    local: Arc<dyn DeckBackend>,
    remote: Option<Arc<dyn DeckBackend>>,
}

impl CardStore {
    #[must_use]
    pub fn new(local: Arc<dyn DeckBackend>) -> Self {
        Self { local, remote: None }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn DeckBackend>) -> Self {
        self.remote = Some(remote);
        self
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Load the learner's deck, local copy first.
    ///
    /// A corrupt copy counts as absent. When only the remote holds a deck it
    /// is copied into the local store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the local store itself cannot be
    /// read. Remote failures are logged and treated as absent.
    pub async fn load(&self, learner_id: &LearnerId) -> Result<Option<LearnerDeck>, StorageError> {
        if let Some(deck) = self.read_local(learner_id).await? {
            debug!(learner = %learner_id, cards = deck.cards().len(), "loaded local deck");
            return Ok(Some(deck));
        }

        let Some(remote) = &self.remote else {
            return Ok(None);
        };

        match remote.load(learner_id).await {
            Ok(Some(deck)) => {
                info!(learner = %learner_id, xp = deck.xp(), "restored deck from remote store");
                if let Err(e) = self.local.save(&deck).await {
                    warn!(learner = %learner_id, error = %e, "could not cache remote deck locally");
                }
                Ok(Some(deck))
            }
            Ok(None) => Ok(None),
            Err(StorageError::Corrupt(reason)) => {
                warn!(learner = %learner_id, %reason, "discarding corrupt remote deck");
                Ok(None)
            }
            Err(e) => {
                warn!(learner = %learner_id, error = %e, "remote load failed");
                Ok(None)
            }
        }
    }

    /// Load the learner's deck, creating an empty one if none exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the local store cannot be read.
    pub async fn load_or_create(
        &self,
        learner_id: &LearnerId,
        now: DateTime<Utc>,
    ) -> Result<LearnerDeck, StorageError> {
        match self.load(learner_id).await? {
            Some(deck) => Ok(deck),
            None => {
                info!(learner = %learner_id, "creating empty deck");
                Ok(LearnerDeck::new(learner_id.clone(), now))
            }
        }
    }

    /// Persist `deck` locally and then remotely, unless the local store
    /// already shows more progress, in which case that copy is adopted and
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the local write fails.
    pub async fn save(&self, deck: &LearnerDeck) -> Result<SaveOutcome, StorageError> {
        let learner_id = deck.learner_id();

        let current = self.read_local(learner_id).await?;
        if let Some(current) = current.filter(|c| c.shows_more_progress_than(deck)) {
            warn!(
                learner = %learner_id,
                stored_xp = current.xp(),
                incoming_xp = deck.xp(),
                "local store shows more progress, keeping it"
            );
            return Ok(SaveOutcome {
                deck: current,
                adopted_local: true,
                remote_error: None,
            });
        }

        self.local.save(deck).await?;

        let remote_error = match &self.remote {
            Some(remote) => match remote.save(deck).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(learner = %learner_id, backend = remote.label(), error = %e, "remote save failed");
                    Some(e)
                }
            },
            None => None,
        };

        debug!(learner = %learner_id, xp = deck.xp(), "deck saved");
        Ok(SaveOutcome {
            deck: deck.clone(),
            adopted_local: false,
            remote_error,
        })
    }

    /// Delete the learner's deck everywhere.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the local delete fails. A remote failure is
    /// logged and returned as `Ok(Some(error))`.
    pub async fn reset(&self, learner_id: &LearnerId) -> Result<Option<StorageError>, StorageError> {
        self.local.delete(learner_id).await?;
        info!(learner = %learner_id, "deck reset");

        match &self.remote {
            Some(remote) => match remote.delete(learner_id).await {
                Ok(()) => Ok(None),
                Err(e) => {
                    warn!(learner = %learner_id, error = %e, "remote delete failed");
                    Ok(Some(e))
                }
            },
            None => Ok(None),
        }
    }

    async fn read_local(&self, learner_id: &LearnerId) -> Result<Option<LearnerDeck>, StorageError> {
        match self.local.load(learner_id).await {
            Ok(deck) => Ok(deck),
            Err(StorageError::Corrupt(reason)) => {
                warn!(learner = %learner_id, %reason, backend = self.local.label(), "discarding corrupt local deck");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
