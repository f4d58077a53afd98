pub mod index_entry;
pub mod record;

pub use index_entry::{content_hash, IndexEntry};
pub use record::{
    next_id, DecisionRecord, RecordId, RecordLink, RecordMetadata, RecordStatus,
};
