use chrono::{DateTime, Utc};
use serde::Serialize;

/// Observable connectivity state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    /// Mirrors the platform's network-presence signal.
    pub is_online: bool,
    /// Outcome of the last conclusive probe.
    pub is_pulse_healthy: bool,
    /// True only while a probe is in flight.
    pub is_connecting: bool,
    pub last_pulse_at: Option<DateTime<Utc>>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            is_online: true,
            is_pulse_healthy: true,
            is_connecting: false,
            last_pulse_at: None,
        }
    }
}

impl ConnectionState {
    /// Host reports online but the backend is not answering.
    pub fn is_zombie(&self) -> bool {
        self.is_online && !self.is_pulse_healthy
    }
}

/// Platform network-presence event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Online,
    Offline,
}
