use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

const DEFAULT_CONTENT_DIR: &str = "data";
const DEFAULT_DB_URL: &str = "sqlite:vocab.sqlite3";
const DEFAULT_MAX_UNITS: u32 = 10;
const DEFAULT_CONTENT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 8_000;

/// Runtime settings for the study engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding `NN_words.json` files.
    pub content_dir: PathBuf,
    /// Local store URL.
    pub db_url: String,
    /// Remote store base URL; `None` disables the remote mirror.
    pub remote_url: Option<String>,
    /// Highest valid unit number.
    pub max_units: u32,
    pub content_timeout: Duration,
    pub remote_timeout: Duration,
    /// Extra XP granted when a unit completes.
    pub completion_bonus_xp: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            db_url: DEFAULT_DB_URL.to_string(),
            remote_url: None,
            max_units: DEFAULT_MAX_UNITS,
            content_timeout: Duration::from_millis(DEFAULT_CONTENT_TIMEOUT_MS),
            remote_timeout: Duration::from_millis(DEFAULT_REMOTE_TIMEOUT_MS),
            completion_bonus_xp: 0,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            content_dir: get("VOCAB_CONTENT_DIR").map_or(defaults.content_dir, PathBuf::from),
            db_url: get("VOCAB_DB_URL").unwrap_or(defaults.db_url),
            remote_url: get("VOCAB_REMOTE_URL"),
            max_units: parse_or("VOCAB_MAX_UNITS", get("VOCAB_MAX_UNITS"), DEFAULT_MAX_UNITS)
                .max(1),
            content_timeout: Duration::from_millis(parse_or(
                "VOCAB_CONTENT_TIMEOUT_MS",
                get("VOCAB_CONTENT_TIMEOUT_MS"),
                DEFAULT_CONTENT_TIMEOUT_MS,
            )),
            remote_timeout: Duration::from_millis(parse_or(
                "VOCAB_REMOTE_TIMEOUT_MS",
                get("VOCAB_REMOTE_TIMEOUT_MS"),
                DEFAULT_REMOTE_TIMEOUT_MS,
            )),
            completion_bonus_xp: parse_or(
                "VOCAB_COMPLETION_BONUS_XP",
                get("VOCAB_COMPLETION_BONUS_XP"),
                0,
            ),
        }
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable setting, using default");
            default
        }),
    }
}
