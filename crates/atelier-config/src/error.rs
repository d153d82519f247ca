//! Core error types.

use thiserror::Error;

/// Core error type for configuration and startup.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A required environment variable is missing or blank
    #[error("Missing required environment variable {0}")]
    MissingEnv(&'static str),

    /// A configuration value could not be parsed
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
