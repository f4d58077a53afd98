//! Remote synchronization for decree annotation refs.
//!
//! No network protocol of its own: everything rides on `git fetch`
//! and `git push`, with conflict resolution applied locally between
//! fetch and the compare-and-swap write.

pub mod error;
pub mod policy;
pub mod sync;

pub use error::ProtocolError;
pub use policy::ConflictPolicy;
pub use sync::{
    PullOutcome, PullResult, PushOutcome, PushResult, RefContent, SyncDirection, SyncEngine,
    SyncRef, SyncResult,
};
