use serde::{Deserialize, Serialize};

use crate::model::ids::WordId;

/// One vocabulary item as delivered by the content provider.
///
/// The engine only needs `id`; the remaining fields are carried through so the
/// presentation layer can render due items without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: WordId,
    #[serde(alias = "spanish")]
    pub source: String,
    #[serde(alias = "english")]
    pub target: String,
    #[serde(default, alias = "clue", skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}
