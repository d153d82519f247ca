//! Authentication error types.

use bounded_fetch::FetchError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Request deadline exceeded
    #[error("Request timed out")]
    Timeout,

    /// Request cancelled by the caller
    #[error("Request aborted")]
    Aborted,

    /// Backend unreachable
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials or token rejected by the provider. The message is the
    /// provider's own, suitable for display next to the form.
    #[error("{0}")]
    Rejected(String),

    /// Anything else, carried as a message
    #[error("{0}")]
    Unknown(String),
}

/// Coarse classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    Timeout,
    Aborted,
    Network,
    Rejected,
    Unknown,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::Timeout => AuthErrorKind::Timeout,
            AuthError::Aborted => AuthErrorKind::Aborted,
            AuthError::Network(_) => AuthErrorKind::Network,
            AuthError::Rejected(_) => AuthErrorKind::Rejected,
            AuthError::Unknown(_) => AuthErrorKind::Unknown,
        }
    }
}

impl From<FetchError> for AuthError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout { .. } => AuthError::Timeout,
            FetchError::Aborted => AuthError::Aborted,
            FetchError::Network(message) => AuthError::Network(message),
            FetchError::Decode(message) => {
                AuthError::Unknown(format!("Unexpected response: {}", message))
            }
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
