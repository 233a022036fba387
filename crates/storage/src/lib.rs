#![forbid(unsafe_code)]

pub mod card_store;
pub mod http;
pub mod repository;
pub mod sqlite;

pub use card_store::{CardStore, SaveOutcome};
pub use http::HttpDeckStore;
pub use repository::{DeckBackend, InMemoryDeckStore, StorageError};
pub use sqlite::{SqliteDeckStore, SqliteInitError};
