//! Transport error types.

use thiserror::Error;

/// Transport error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Deadline exceeded before the request settled
    #[error("Request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// Cancelled by the caller
    #[error("Request aborted")]
    Aborted,

    /// Connection, DNS or protocol failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    Aborted,
    Network,
    Decode,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Timeout { .. } => FetchErrorKind::Timeout,
            FetchError::Aborted => FetchErrorKind::Aborted,
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Decode(_) => FetchErrorKind::Decode,
        }
    }

    /// Returns true if the failure happened below HTTP: the backend was never
    /// heard from.
    pub fn is_network_class(&self) -> bool {
        !matches!(self, FetchError::Decode(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Result type alias using FetchError.
pub type FetchResult<T> = Result<T, FetchError>;
