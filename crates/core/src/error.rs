use thiserror::Error;

use crate::model::{CardError, DeckError, IdError, ReviewError};
use crate::session::SessionOpError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Session(#[from] SessionOpError),
}
