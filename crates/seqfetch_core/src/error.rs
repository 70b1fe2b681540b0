use std::fmt;

use thiserror::Error;

/// Failure reported by a request function.
///
/// The sequencer stores it and hands it to callbacks; it never inspects `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RequestError {
    pub kind: FailureKind,
    pub message: String,
}

impl RequestError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, message)
    }

    pub fn business(code: i64, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Business { code }, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(FailureKind::Decode, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Timeout,
    HttpStatus(u16),
    /// Backend answered, but with an application-level error code.
    Business { code: i64 },
    Decode,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Business { code } => write!(f, "business error {code}"),
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::Other => write!(f, "request failed"),
        }
    }
}

/// Misconfiguration detected while building a sequencer or data source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no request function configured")]
    MissingRequester,
    #[error("pagination key `{field}` must not be empty")]
    EmptyKey { field: &'static str },
    #[error("page number and page size share the key `{key}`")]
    DuplicateKeys { key: String },
    #[error("page size must be greater than zero")]
    ZeroPageSize,
    #[error("page number must be greater than zero")]
    ZeroPageNum,
    #[error("immediate loading requires a running tokio runtime")]
    NoRuntime,
}
