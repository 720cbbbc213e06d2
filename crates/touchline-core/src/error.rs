/// Core error types for the Touchline engine.
use std::path::PathBuf;

/// A specialized Result type for Touchline operations.
pub type TouchlineResult<T> = Result<T, TouchlineError>;

/// Top-level error type encompassing all Touchline subsystems.
#[derive(Debug, thiserror::Error)]
pub enum TouchlineError {
    /// A track broke one of its structural invariants. Always a bug in the
    /// caller or a corrupted persisted payload.
    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("malformed keyframe payload: {0}")]
    MalformedPayload(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("config error: {message} ({path:?})")]
    Config { message: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TouchlineError {
    /// Create an invariant violation error from a list of individual problems.
    pub fn invariant<I, S>(problems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let joined: Vec<String> = problems.into_iter().map(|p| p.to_string()).collect();
        TouchlineError::Invariant(joined.join("; "))
    }

    /// Create a config error tied to a file.
    pub fn config(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        TouchlineError::Config {
            message: message.into(),
            path: path.into(),
        }
    }
}
