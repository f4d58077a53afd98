use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A unique identifier for a decision record.
/// Sequential and human-readable by convention (`DR-0001`), but any
/// non-empty token without whitespace is accepted so imported records
/// keep their original ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Parse and validate an ID string.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.is_empty() {
            return Err(CoreError::InvalidId("ID must not be empty".to_string()));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidId(format!(
                "ID must not contain whitespace: {s:?}"
            )));
        }
        Ok(Self(s))
    }

    /// Formats a sequential id, e.g. `format("DR-", 7)` -> `DR-0007`.
    pub fn format(prefix: &str, number: u32) -> Self {
        Self(format!("{prefix}{number:04}"))
    }

    /// The number this id carries under `prefix`, if any.
    pub fn sequence_number(&self, prefix: &str) -> Option<u32> {
        self.0.strip_prefix(prefix)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The next free sequential id under `prefix`, given the ids already in
/// use. Non-matching ids are ignored.
pub fn next_id<'a>(existing: impl IntoIterator<Item = &'a RecordId>, prefix: &str) -> RecordId {
    let max = existing
        .into_iter()
        .filter_map(|id| id.sequence_number(prefix))
        .max()
        .unwrap_or(0);
    RecordId::format(prefix, max + 1)
}

/// Lifecycle status of a decision record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Draft,
    Proposed,
    Accepted,
    Rejected,
    Deprecated,
    Superseded,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 6] = [
        RecordStatus::Draft,
        RecordStatus::Proposed,
        RecordStatus::Accepted,
        RecordStatus::Rejected,
        RecordStatus::Deprecated,
        RecordStatus::Superseded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Proposed => "proposed",
            RecordStatus::Accepted => "accepted",
            RecordStatus::Rejected => "rejected",
            RecordStatus::Deprecated => "deprecated",
            RecordStatus::Superseded => "superseded",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s.to_lowercase())
            .copied()
            .ok_or_else(|| CoreError::InvalidStatus(s.to_string()))
    }
}

/// A typed relation to another record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLink {
    /// Relation kind, e.g. `relates-to`, `amends`.
    pub rel: String,
    pub target: RecordId,
}

/// Structured metadata carried alongside the opaque body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecordMetadata {
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deciders: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<RecordLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<RecordId>,
}

/// A decision record. The body is opaque text owned by whatever
/// authored it; the core only ever reads it for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub metadata: RecordMetadata,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(id: RecordId, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            metadata: RecordMetadata::default(),
            body: body.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the record as modified now. Callers mutate fields first,
    /// then touch, then `put`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parse_rejects_bad_input() {
        assert!(RecordId::parse("").is_err());
        assert!(RecordId::parse("DR 1").is_err());
        assert!(RecordId::parse("DR-0001").is_ok());
    }

    #[test]
    fn test_next_id_skips_foreign_prefixes() {
        let ids = [
            RecordId::from("DR-0001"),
            RecordId::from("DR-0005"),
            RecordId::from("ADR-0099"),
            RecordId::from("notes"),
        ];
        assert_eq!(next_id(ids.iter(), "DR-"), RecordId::from("DR-0006"));
        assert_eq!(next_id([].iter(), "DR-"), RecordId::from("DR-0001"));
    }

    #[test]
    fn test_status_round_trip() {
        for status in RecordStatus::ALL {
            assert_eq!(status.as_str().parse::<RecordStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn test_record_json_shape_is_flat() {
        let mut record = DecisionRecord::new(RecordId::from("DR-0001"), "Use Rust");
        record.metadata.status = RecordStatus::Accepted;
        record.metadata.tags = vec!["lang".to_string()];
        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "DR-0001");
        assert_eq!(value["status"], "accepted");
        assert_eq!(value["tags"][0], "lang");
        // Empty optional fields stay off the wire.
        assert!(value.get("supersedes").is_none());
        assert!(value.get("deciders").is_none());

        let back: DecisionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
