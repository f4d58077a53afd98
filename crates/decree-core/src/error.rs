use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("git command failed ({command}): exit code {exit_code}: {stderr}")]
    Process {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("git command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("concurrent update detected on {reference} (re-read and retry)")]
    Conflict { reference: String },

    #[error("record not found: {id}")]
    NotFound { id: String },

    #[error("corrupt container in {reference}: {detail}")]
    CorruptContainer { reference: String, detail: String },

    #[error("git executable not found on PATH")]
    GitNotFound,

    #[error("not inside a git repository")]
    NotARepository,

    #[error("repository not initialized for decree (run `decree init`)")]
    NotInitialized,

    #[error("invalid record ID: {0}")]
    InvalidId(String),

    #[error("invalid record status: {0}")]
    InvalidStatus(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl CoreError {
    /// Fill in the ref name on a corrupt-container report raised below
    /// the layer that knows which ref the bytes came from.
    pub fn in_reference(self, reference: &str) -> CoreError {
        match self {
            CoreError::CorruptContainer { detail, .. } => CoreError::CorruptContainer {
                reference: reference.to_string(),
                detail,
            },
            other => other,
        }
    }
}
