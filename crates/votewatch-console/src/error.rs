use thiserror::Error;
use votewatch_protocol::ProtocolError;

/// Failure of a single backend request.
///
/// Every variant renders as one line of text; the error region shows it
/// verbatim without distinguishing the cause.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The backend answered with a non-success status.
    #[error("{status} {status_text}: {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    /// The request never completed (connect, DNS, timeout).
    #[error("network error: {0}")]
    Transport(String),

    /// A success response whose body is not usable JSON.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The path would leave the configured origin.
    #[error("invalid request path '{0}'")]
    InvalidPath(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        ClientError::Decode(e.to_string())
    }
}

/// Failure while loading monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
