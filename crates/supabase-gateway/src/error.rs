//! Gateway error types.

use bounded_fetch::FetchError;
use pulse_monitor::ProbeError;
use session_manager::AuthError;
use thiserror::Error;

/// Gateway error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    /// Non-success answer; `message` is the API's own when it sent one.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::InvalidResponse(err.to_string())
    }
}

impl From<GatewayError> for AuthError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Transport(err) => AuthError::from(err),
            GatewayError::Api { status, message } if status >= 500 => {
                AuthError::Unknown(format!("{} (status {})", message, status))
            }
            GatewayError::Api { message, .. } => AuthError::Rejected(message),
            GatewayError::InvalidResponse(message) => AuthError::Unknown(message),
        }
    }
}

impl From<GatewayError> for ProbeError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Transport(err) => ProbeError::Transport(err),
            GatewayError::Api { status, message } => ProbeError::Rejected { status, message },
            GatewayError::InvalidResponse(message) => {
                ProbeError::Transport(FetchError::Decode(message))
            }
        }
    }
}

/// Result type alias using GatewayError.
pub type GatewayResult<T> = Result<T, GatewayError>;
