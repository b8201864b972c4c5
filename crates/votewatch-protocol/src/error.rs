use thiserror::Error;

/// Errors raised while decoding backend payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed poll snapshot: {0}")]
    MalformedPoll(String),

    #[error("malformed status snapshot: {0}")]
    MalformedStatus(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
