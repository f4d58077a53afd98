//! Core data model and storage engine for decree.
//!
//! Decision records live in git-notes-style annotation refs: one
//! container blob per namespace, anchored to the empty-tree object so
//! the refs survive history rewrites. All git interaction is
//! subprocess-based; the only concurrency primitive is git's atomic
//! compare-and-swap ref update, surfaced here as
//! [`error::CoreError::Conflict`].

pub mod config;
pub mod error;
pub mod hooks;
pub mod model;
pub mod runner;
pub mod storage;

pub use error::CoreError;
pub use model::{DecisionRecord, IndexEntry, RecordId, RecordMetadata, RecordStatus};
pub use runner::{GitRunner, RunOutput};
pub use storage::RecordStore;
