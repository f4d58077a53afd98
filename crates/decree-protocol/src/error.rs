use decree_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Remote not found: {0}")]
    RemoteNotFound(String),

    #[error("{reference} diverged on {remote}: {detail}")]
    Conflict {
        remote: String,
        reference: String,
        detail: String,
    },

    #[error("Unknown conflict policy: {0}")]
    UnknownPolicy(String),
}

impl ProtocolError {
    /// True for both flavors of optimistic-concurrency failure: a
    /// rejected remote push and a lost local compare-and-swap.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ProtocolError::Conflict { .. } | ProtocolError::Core(CoreError::Conflict { .. })
        )
    }
}
