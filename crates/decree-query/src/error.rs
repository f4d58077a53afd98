use decree_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
