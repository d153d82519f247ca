//! Line-oriented platform events read by `atelier run`.

use anyhow::{anyhow, bail};
use focus_coordinator::AttentionEvent;
use pulse_monitor::Presence;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    Attention(AttentionEvent),
    Presence(Presence),
    Navigate(String),
    Login { email: String, password: String },
    Logout,
    Status,
    Pulse,
}

impl FromStr for PlatformEvent {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let mut parts = line.split_whitespace();
        let command = parts.next().ok_or_else(|| anyhow!("empty command"))?;

        let event = match command {
            "focus" => PlatformEvent::Attention(AttentionEvent::WindowFocused),
            "visible" => PlatformEvent::Attention(AttentionEvent::BecameVisible),
            "hidden" => PlatformEvent::Attention(AttentionEvent::BecameHidden),
            "online" => PlatformEvent::Presence(Presence::Online),
            "offline" => PlatformEvent::Presence(Presence::Offline),
            "navigate" => {
                let path = parts.next().ok_or_else(|| anyhow!("usage: navigate <path>"))?;
                PlatformEvent::Navigate(path.to_string())
            }
            "login" => match (parts.next(), parts.next()) {
                (Some(email), Some(password)) => PlatformEvent::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => bail!("usage: login <email> <password>"),
            },
            "logout" => PlatformEvent::Logout,
            "status" => PlatformEvent::Status,
            "pulse" => PlatformEvent::Pulse,
            other => bail!("unknown command: {}", other),
        };

        if parts.next().is_some() {
            bail!("unexpected arguments after {}", command);
        }
        Ok(event)
    }
}
