//! Core configuration and utilities for the Atelier client.

mod config;
mod error;
mod logging;

pub use config::{
    Config, LogFormat, DEFAULT_LOGIN_PATH, DEFAULT_LOG_LEVEL, DEFAULT_PULSE_INTERVAL_MS,
    DEFAULT_PULSE_TABLE, DEFAULT_REFRESH_GRACE_MS, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_REVALIDATE_MIN_INTERVAL_MS, ENV_ANON_KEY, ENV_SUPABASE_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
