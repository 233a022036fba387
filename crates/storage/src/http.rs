//! Remote deck store reached over HTTP.
//!
//! `GET {base}/api/deck/{learnerId}` returns the stored deck (404 when
//! absent), `PUT` replaces it with the JSON body and `DELETE` removes it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;
use vocab_core::model::{LearnerDeck, LearnerId};

use crate::repository::{DeckBackend, StorageError, decode_deck};

#[derive(Clone)]
pub struct HttpDeckStore {
    client: Client,
    base_url: Url,
}

impl HttpDeckStore {
    /// Build a store for `base_url` whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if `base_url` is not a usable base
    /// or the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StorageError> {
        let raw = base_url.into();
        let base_url = Url::parse(raw.trim())
            .map_err(|e| StorageError::Connection(format!("invalid base url {raw:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::Connection(format!("invalid base url {raw:?}")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// `{base}/api/deck/{learnerId}`, with the learner id encoded as a single
    /// path segment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the base url cannot take path
    /// segments.
    pub fn deck_url(&self, learner_id: &LearnerId) -> Result<Url, StorageError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StorageError::Connection(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "deck", learner_id.as_str()]);
        Ok(url)
    }
}

fn transport(e: reqwest::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn status_error(status: StatusCode) -> StorageError {
    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound,
        StatusCode::CONFLICT => StorageError::Conflict,
        other => StorageError::Http(other.as_u16()),
    }
}

#[async_trait]
impl DeckBackend for HttpDeckStore {
    fn label(&self) -> &'static str {
        "remote"
    }

    async fn load(&self, learner_id: &LearnerId) -> Result<Option<LearnerDeck>, StorageError> {
        let url = self.deck_url(learner_id)?;
        debug!(%url, "fetching remote deck");
        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status));
        }

        let body = response.text().await.map_err(transport)?;
        decode_deck(&body, learner_id).map(Some)
    }

    async fn save(&self, deck: &LearnerDeck) -> Result<(), StorageError> {
        let url = self.deck_url(deck.learner_id())?;
        debug!(%url, xp = deck.xp(), "writing remote deck");
        let response = self
            .client
            .put(url)
            .json(deck)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status))
        }
    }

    async fn delete(&self, learner_id: &LearnerId) -> Result<(), StorageError> {
        let url = self.deck_url(learner_id)?;
        let response = self.client.delete(url).send().await.map_err(transport)?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(status_error(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_url_strips_trailing_slash() {
        let store = HttpDeckStore::new("https://example.test/", Duration::from_secs(1)).unwrap();
        let learner = LearnerId::new("0xabc").unwrap();
        assert_eq!(
            store.deck_url(&learner).unwrap().as_str(),
            "https://example.test/api/deck/0xabc"
        );
    }

    #[test]
    fn deck_url_keeps_base_path() {
        let store = HttpDeckStore::new("https://example.test/sync", Duration::from_secs(1)).unwrap();
        let learner = LearnerId::new("0xabc").unwrap();
        assert_eq!(
            store.deck_url(&learner).unwrap().as_str(),
            "https://example.test/sync/api/deck/0xabc"
        );
    }

    #[test]
    fn learner_id_is_one_encoded_segment() {
        let store = HttpDeckStore::new("https://example.test", Duration::from_secs(1)).unwrap();
        let learner = LearnerId::new("a/b?c#d e").unwrap();
        let url = store.deck_url(&learner).unwrap();

        assert_eq!(url.as_str(), "https://example.test/api/deck/a%2Fb%3Fc%23d%20e");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        let last = url.path_segments().unwrap().next_back().unwrap();
        assert_eq!(last, "a%2Fb%3Fc%23d%20e");
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            HttpDeckStore::new("not a url", Duration::from_secs(1)),
            Err(StorageError::Connection(_))
        ));
        assert!(matches!(
            HttpDeckStore::new("mailto:sync@example.test", Duration::from_secs(1)),
            Err(StorageError::Connection(_))
        ));
    }

    #[test]
    fn statuses_map_to_storage_errors() {
        assert!(matches!(status_error(StatusCode::NOT_FOUND), StorageError::NotFound));
        assert!(matches!(status_error(StatusCode::CONFLICT), StorageError::Conflict));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY),
            StorageError::Http(502)
        ));
    }

    #[tokio::test]
    async fn unreachable_remote_is_a_connection_error() {
        let store = HttpDeckStore::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let learner = LearnerId::new("0xabc").unwrap();
        assert!(matches!(
            store.load(&learner).await,
            Err(StorageError::Connection(_))
        ));
    }
}
