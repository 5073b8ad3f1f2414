use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::LibraryError;

/// Metadata entry for one produced PDF.
///
/// `uri` is the identity used to correlate recent and favourite entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub name: String,
    pub uri: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Outcome of `toggle_favourite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavouriteToggle {
    Added,
    Removed,
}

/// Result of `delete_all`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteAllReport {
    /// Files removed (or already absent).
    pub deleted: usize,
    /// Records whose file could not be deleted; they stay in the recent list.
    pub failed: Vec<DocumentRecord>,
}

impl DeleteAllReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Strictly decode a stored list.
///
/// The value must be a JSON array of records with string `name`, `uri` and
/// `date`. Repeated uris keep their first (newest) occurrence.
pub fn decode_list(key: &str, raw: &str) -> Result<Vec<DocumentRecord>, LibraryError> {
    let records: Vec<DocumentRecord> =
        serde_json::from_str(raw).map_err(|e| LibraryError::StorageCorrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

    let mut seen = HashSet::with_capacity(records.len());
    Ok(records
        .into_iter()
        .filter(|r| seen.insert(r.uri.clone()))
        .collect())
}

pub fn encode_list(records: &[DocumentRecord]) -> Result<String, LibraryError> {
    Ok(serde_json::to_string(records)?)
}

/// Prepend `record`, drop any older entry with the same uri, cap the length.
pub fn insert_recent(
    list: Vec<DocumentRecord>,
    record: DocumentRecord,
    capacity: usize,
) -> Vec<DocumentRecord> {
    let mut next = Vec::with_capacity(list.len() + 1);
    let uri = record.uri.clone();
    next.push(record);
    next.extend(list.into_iter().filter(|r| r.uri != uri));
    next.truncate(capacity);
    next
}
