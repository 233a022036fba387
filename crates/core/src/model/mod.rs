mod card;
mod deck;
mod ids;
mod review;
mod vocabulary;

pub use ids::{IdError, LearnerId, UnitId, WordId};

pub use card::{Card, CardError, DEFAULT_EASE_FACTOR, MAX_INTERVAL_DAYS, MIN_EASE_FACTOR};
pub use deck::{DeckError, DeckProgress, LearnerDeck};
pub use review::{Quality, Rating, ReviewError};
pub use vocabulary::VocabularyItem;
