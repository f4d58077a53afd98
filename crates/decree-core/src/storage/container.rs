//! Line-oriented container codec.
//!
//! A container blob is one JSON object per line, keyed by id. Decoding
//! keeps the raw line of every untouched entry so re-encoding is
//! byte-identical, which is what makes repeated merges idempotent.
//! Lines that fail to parse are retained in place and reported rather
//! than dropped; they keep round-tripping until someone repairs or
//! rebuilds the ref.
//!
//! Duplicate ids can only arise from concatenating two containers
//! (the `union` merge policy). The decoder resolves them by keeping
//! the entry with the newer `updated_at`; on an exact tie the later
//! occurrence wins, so a local entry appended after the remote copy
//! takes precedence.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;
use crate::model::{DecisionRecord, IndexEntry};

/// An entry type a container can hold: stable key plus a revision
/// timestamp for duplicate resolution.
pub trait Keyed: Serialize + DeserializeOwned {
    fn key(&self) -> &str;
    fn revised_at(&self) -> DateTime<Utc>;
}

impl Keyed for DecisionRecord {
    fn key(&self) -> &str {
        self.id.as_str()
    }
    fn revised_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Keyed for IndexEntry {
    fn key(&self) -> &str {
        self.id.as_str()
    }
    fn revised_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A line that failed to decode, preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptLine {
    pub line_no: usize,
    pub raw: String,
    pub error: String,
}

#[derive(Debug, Clone)]
enum Line<T> {
    Entry { value: T, raw: String },
    Corrupt(CorruptLine),
}

/// Decoded container: entries in line order, corrupt lines in place.
#[derive(Debug, Clone, Default)]
pub struct Container<T> {
    lines: Vec<Line<T>>,
}

impl<T: Keyed> Container<T> {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Decode a container blob. Invalid UTF-8 is fatal, as is a
    /// non-empty blob with no decodable entry at all; individual
    /// malformed lines are kept as [`CorruptLine`]s for the caller to
    /// report. Byte-identical corrupt lines collapse to one occurrence,
    /// like the id de-dupe for entries, so merging two sides that carry
    /// the same damage does not grow the container.
    pub fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        let text = String::from_utf8(bytes.to_vec())?;
        let mut container = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(raw) {
                Ok(value) => container.absorb(value, raw.to_string()),
                Err(e) => {
                    let seen = container
                        .lines
                        .iter()
                        .any(|line| matches!(line, Line::Corrupt(c) if c.raw == raw));
                    if !seen {
                        container.lines.push(Line::Corrupt(CorruptLine {
                            line_no: idx + 1,
                            raw: raw.to_string(),
                            error: e.to_string(),
                        }));
                    }
                }
            }
        }
        if container.is_empty() && !container.lines.is_empty() {
            return Err(CoreError::CorruptContainer {
                reference: String::new(),
                detail: format!(
                    "no decodable entries among {} line(s)",
                    container.lines.len()
                ),
            });
        }
        Ok(container)
    }

    /// Re-encode. Untouched entries and corrupt lines are emitted from
    /// their preserved raw text.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for line in &self.lines {
            match line {
                Line::Entry { raw, .. } => out.extend_from_slice(raw.as_bytes()),
                Line::Corrupt(c) => out.extend_from_slice(c.raw.as_bytes()),
            }
            out.push(b'\n');
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { value, .. } if value.key() == key => Some(value),
            _ => None,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace by key. A replaced entry keeps its position;
    /// a new entry appends.
    pub fn insert(&mut self, value: T) -> Result<(), CoreError> {
        let raw = serde_json::to_string(&value)?;
        match self.position(value.key()) {
            Some(idx) => self.lines[idx] = Line::Entry { value, raw },
            None => self.lines.push(Line::Entry { value, raw }),
        }
        Ok(())
    }

    /// Remove by key. Returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(idx) => {
                self.lines.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Entry keys in container (insertion) order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries().map(Keyed::key).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &T> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { value, .. } => Some(value),
            Line::Corrupt(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    pub fn corrupt_lines(&self) -> Vec<&CorruptLine> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Corrupt(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Stable sort of all lines by key (corrupt lines by raw text).
    /// The index ref is kept sorted so rebuilds and merges are
    /// order-independent.
    pub fn sort(&mut self) {
        self.lines.sort_by(|a, b| Self::sort_token(a).cmp(Self::sort_token(b)));
    }

    fn sort_token(line: &Line<T>) -> &str {
        match line {
            Line::Entry { value, .. } => value.key(),
            Line::Corrupt(c) => c.raw.as_str(),
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.lines.iter().position(|line| match line {
            Line::Entry { value, .. } => value.key() == key,
            Line::Corrupt(_) => false,
        })
    }

    fn absorb(&mut self, value: T, raw: String) {
        match self.position(value.key()) {
            Some(idx) => {
                let newer = match &self.lines[idx] {
                    Line::Entry { value: old, .. } => value.revised_at() >= old.revised_at(),
                    Line::Corrupt(_) => true,
                };
                if newer {
                    self.lines[idx] = Line::Entry { value, raw };
                }
            }
            None => self.lines.push(Line::Entry { value, raw }),
        }
    }
}

/// Concatenate two container blobs for a `union`-style decode. A
/// newline is inserted when the first half lacks a trailing one.
pub fn concat(first: &[u8], second: &[u8]) -> Vec<u8> {
    let mut bytes = first.to_vec();
    if !bytes.is_empty() && !bytes.ends_with(b"\n") {
        bytes.push(b'\n');
    }
    bytes.extend_from_slice(second);
    bytes
}
