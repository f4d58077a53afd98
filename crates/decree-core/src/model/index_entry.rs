use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::record::{DecisionRecord, RecordId, RecordStatus};

/// One record's projection into the search index: the searchable text,
/// the metadata used for filtering, and a content hash of the source
/// record so staleness is detectable without reading the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: RecordId,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub text: String,
    pub content_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl IndexEntry {
    pub fn from_record(record: &DecisionRecord) -> Self {
        Self {
            id: record.id.clone(),
            status: record.metadata.status,
            tags: record.metadata.tags.clone(),
            text: searchable_text(record),
            content_hash: content_hash(record),
            updated_at: record.updated_at,
        }
    }

    /// True when this entry no longer reflects `record`.
    pub fn is_stale_for(&self, record: &DecisionRecord) -> bool {
        self.content_hash != content_hash(record)
    }
}

/// The text `search` matches against: id, tag line, then the body.
fn searchable_text(record: &DecisionRecord) -> String {
    format!(
        "{}\n{}\n{}",
        record.id,
        record.metadata.tags.join(" "),
        record.body
    )
}

/// Hash of the record's canonical serialized form. Field order is fixed
/// by the struct, so regeneration is deterministic across clones.
pub fn content_hash(record: &DecisionRecord) -> String {
    let canonical = serde_json::to_string(record).unwrap_or_default();
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}
