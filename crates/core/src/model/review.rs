use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when building review inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("quality score must be between 0 and 5, got {0}")]
    InvalidQuality(u8),

    #[error("unknown rating: {0}")]
    UnknownRating(String),
}

//
// ─── QUALITY ──────────────────────────────────────────────────────────────────
//

/// Recall quality on the classical SM-2 0–5 scale.
///
/// Scores below [`Quality::PASSING`] count as a failed recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Lowest score treated as a successful recall.
    pub const PASSING: Quality = Quality(3);
    /// The maximal score; rewards a double repetition step.
    pub const PERFECT: Quality = Quality(5);

    /// Creates a quality score.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidQuality` if the value is above 5.
    pub fn new(value: u8) -> Result<Self, ReviewError> {
        if value > 5 {
            return Err(ReviewError::InvalidQuality(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        self >= Self::PASSING
    }

    #[must_use]
    pub fn is_perfect(self) -> bool {
        self == Self::PERFECT
    }
}

impl TryFrom<u8> for Quality {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

//
// ─── RATING ───────────────────────────────────────────────────────────────────
//

/// The three answer buttons offered to the learner.
///
/// Each rating maps to a fixed quality score and XP award:
///
/// | rating    | quality | xp |
/// |-----------|---------|----|
/// | `NoClue`  | 1       | 1  |
/// | `GotOne`  | 3       | 3  |
/// | `GotBoth` | 5       | 5  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    /// Neither side recalled.
    NoClue,
    /// One side recalled.
    GotOne,
    /// Both sides recalled.
    GotBoth,
}

impl Rating {
    pub const ALL: [Rating; 3] = [Rating::NoClue, Rating::GotOne, Rating::GotBoth];

    #[must_use]
    pub fn quality(self) -> Quality {
        match self {
            Rating::NoClue => Quality(1),
            Rating::GotOne => Quality(3),
            Rating::GotBoth => Quality(5),
        }
    }

    #[must_use]
    pub fn xp(self) -> u32 {
        match self {
            Rating::NoClue => 1,
            Rating::GotOne => 3,
            Rating::GotBoth => 5,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::NoClue => "no-clue",
            Rating::GotOne => "got-one",
            Rating::GotBoth => "got-both",
        }
    }
}

impl std::str::FromStr for Rating {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "no-clue" | "no-idea" => Ok(Rating::NoClue),
            "got-one" => Ok(Rating::GotOne),
            "got-both" => Ok(Rating::GotBoth),
            other => Err(ReviewError::UnknownRating(other.to_owned())),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
