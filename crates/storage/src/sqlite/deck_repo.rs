use sqlx::Row;
use vocab_core::model::{LearnerDeck, LearnerId};

use super::SqliteDeckStore;
use crate::repository::{DeckBackend, StorageError, decode_deck, encode_deck};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

#[async_trait::async_trait]
impl DeckBackend for SqliteDeckStore {
    fn label(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self, learner_id: &LearnerId) -> Result<Option<LearnerDeck>, StorageError> {
        let row = sqlx::query("SELECT payload FROM learner_decks WHERE learner_id = ?1")
            .bind(learner_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => {
                let payload: String = row
                    .try_get("payload")
                    .map_err(|e| StorageError::Corrupt(e.to_string()))?;
                decode_deck(&payload, learner_id).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, deck: &LearnerDeck) -> Result<(), StorageError> {
        let payload = encode_deck(deck)?;
        let progress = deck.progress();

        sqlx::query(
            r"
            INSERT INTO learner_decks (learner_id, payload, xp, card_count, completed_units, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(learner_id) DO UPDATE SET
                payload = excluded.payload,
                xp = excluded.xp,
                card_count = excluded.card_count,
                completed_units = excluded.completed_units,
                updated_at = excluded.updated_at
            ",
        )
        .bind(deck.learner_id().as_str())
        .bind(payload)
        .bind(to_i64("xp", progress.xp)?)
        .bind(to_i64("card_count", progress.cards as u64)?)
        .bind(to_i64("completed_units", progress.completed_units as u64)?)
        .bind(deck.last_synced_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete(&self, learner_id: &LearnerId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM learner_decks WHERE learner_id = ?1")
            .bind(learner_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
