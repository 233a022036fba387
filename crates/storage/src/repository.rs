use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use vocab_core::model::{LearnerDeck, LearnerId};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored deck exists but cannot be decoded or fails validation.
    #[error("corrupt deck: {0}")]
    Corrupt(String),

    #[error("remote store answered with status {0}")]
    Http(u16),
}

/// Encode a deck into the stored JSON payload.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_deck(deck: &LearnerDeck) -> Result<String, StorageError> {
    serde_json::to_string(deck).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Decode a stored payload and check it belongs to `learner_id`.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` if the payload does not parse or the deck
/// fails structural validation.
pub fn decode_deck(payload: &str, learner_id: &LearnerId) -> Result<LearnerDeck, StorageError> {
    let deck: LearnerDeck =
        serde_json::from_str(payload).map_err(|e| StorageError::Corrupt(e.to_string()))?;
    deck.validate_for(learner_id)
        .map_err(|e| StorageError::Corrupt(e.to_string()))?;
    Ok(deck)
}

/// A place that stores one serialized deck per learner.
#[async_trait]
pub trait DeckBackend: Send + Sync {
    /// Short name used in log lines.
    fn label(&self) -> &'static str;

    /// Fetch the deck stored for `learner_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` if a stored deck cannot be decoded, or
    /// other storage errors if the backend cannot be reached.
    async fn load(&self, learner_id: &LearnerId) -> Result<Option<LearnerDeck>, StorageError>;

    /// Persist or replace the learner's deck.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn save(&self, deck: &LearnerDeck) -> Result<(), StorageError>;

    /// Remove the learner's deck. Removing a missing deck is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    async fn delete(&self, learner_id: &LearnerId) -> Result<(), StorageError>;
}

/// Simple in-memory backend for testing and prototyping.
///
/// Stores the same JSON payload the other backends store, so decoding and
/// corruption handling behave identically.
#[derive(Clone, Default)]
pub struct InMemoryDeckStore {
    decks: Arc<Mutex<HashMap<LearnerId, String>>>,
}

impl InMemoryDeckStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw payload as-is, bypassing encoding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_raw(&self, learner_id: LearnerId, payload: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(learner_id, payload.into());
        Ok(())
    }

    /// Number of stored decks.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        self.len().map(|n| n == 0)
    }
}

#[async_trait]
impl DeckBackend for InMemoryDeckStore {
    fn label(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, learner_id: &LearnerId) -> Result<Option<LearnerDeck>, StorageError> {
        let payload = {
            let guard = self
                .decks
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            guard.get(learner_id).cloned()
        };
        payload.map(|p| decode_deck(&p, learner_id)).transpose()
    }

    async fn save(&self, deck: &LearnerDeck) -> Result<(), StorageError> {
        let payload = encode_deck(deck)?;
        self.insert_raw(deck.learner_id().clone(), payload)
    }

    async fn delete(&self, learner_id: &LearnerId) -> Result<(), StorageError> {
        let mut guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(learner_id);
        Ok(())
    }
}
