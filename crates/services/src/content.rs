//! Vocabulary content for units.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use vocab_core::model::{UnitId, VocabularyItem};

use crate::error::ContentError;

/// Read-only source of the ordered vocabulary items of each unit.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Items of `unit`, in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` if the unit's content is missing or unreadable.
    async fn unit_items(&self, unit: UnitId) -> Result<Vec<VocabularyItem>, ContentError>;
}

#[derive(Deserialize)]
struct WordFile {
    words: Vec<VocabularyItem>,
}

/// Reads `{dir}/{NN}_words.json`, where `NN` is the zero-padded unit number.
#[derive(Clone, Debug)]
pub struct JsonContentProvider {
    dir: PathBuf,
}

impl JsonContentProvider {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn unit_path(&self, unit: UnitId) -> PathBuf {
        unit_file(&self.dir, unit)
    }
}

fn unit_file(dir: &Path, unit: UnitId) -> PathBuf {
    dir.join(format!("{:02}_words.json", unit.value()))
}

#[async_trait]
impl ContentProvider for JsonContentProvider {
    async fn unit_items(&self, unit: UnitId) -> Result<Vec<VocabularyItem>, ContentError> {
        let path = self.unit_path(unit);
        debug!(path = %path.display(), %unit, "reading unit content");

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContentError::NotFound(unit));
            }
            Err(e) => return Err(e.into()),
        };

        let file: WordFile = serde_json::from_str(&raw).map_err(|e| ContentError::Malformed {
            unit,
            reason: e.to_string(),
        })?;
        Ok(file.words)
    }
}

/// Content held in memory, for tests and embedded word lists.
#[derive(Clone, Debug, Default)]
pub struct StaticContentProvider {
    units: HashMap<UnitId, Vec<VocabularyItem>>,
}

impl StaticContentProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_unit(mut self, unit: UnitId, items: Vec<VocabularyItem>) -> Self {
        self.units.insert(unit, items);
        self
    }
}

#[async_trait]
impl ContentProvider for StaticContentProvider {
    async fn unit_items(&self, unit: UnitId) -> Result<Vec<VocabularyItem>, ContentError> {
        self.units
            .get(&unit)
            .cloned()
            .ok_or(ContentError::NotFound(unit))
    }
}
