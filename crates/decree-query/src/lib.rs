pub mod error;
pub mod indexed;
pub mod search;

pub use error::QueryError;
pub use indexed::IndexedStore;
pub use search::{SearchEngine, SearchHit, SearchOptions};
