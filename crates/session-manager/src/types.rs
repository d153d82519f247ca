//! Session, user and auth-event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Authenticated user identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form profile attributes (Supabase `user_metadata`).
    #[serde(default, rename = "user_metadata")]
    pub attributes: serde_json::Value,
}

/// Credential bundle issued by the auth provider.
///
/// Sessions are never mutated: a refresh produces a new value that replaces
/// the old one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as Unix epoch seconds.
    pub expires_at: i64,
    pub user: User,
}

impl Session {
    /// Returns true if the session expires within `window` from now
    /// (or has already expired).
    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_within_at(window, Utc::now())
    }

    pub fn expires_within_at(&self, window: Duration, now: DateTime<Utc>) -> bool {
        let remaining_ms = self
            .expires_at
            .saturating_mul(1000)
            .saturating_sub(now.timestamp_millis());
        remaining_ms <= i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Kind of auth-state change pushed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Auth-state change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthStateEvent {
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }
}

/// Which sessions a sign-out revokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutScope {
    /// Every session of the user.
    #[default]
    Global,
    /// Only this client's session.
    Local,
    /// Every session except this one.
    Others,
}

impl SignOutScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignOutScope::Global => "global",
            SignOutScope::Local => "local",
            SignOutScope::Others => "others",
        }
    }
}

/// New-account registration data.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub tax_id: String,
}

/// Provider answer to a sign-up.
///
/// `session` is present when the account was confirmed immediately; otherwise
/// the user must confirm by email first.
#[derive(Debug, Clone, Default)]
pub struct SignUpOutcome {
    pub session: Option<Session>,
    pub user: Option<User>,
}

/// Uniform result of a user-initiated auth operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    /// Message to show next to the form when the operation failed.
    pub error: Option<String>,
    /// Informational message on success.
    pub message: Option<String>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            error: None,
            message: Some(message.into()),
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            message: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session_expiring_at(expires_at: i64) -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at,
            user: User {
                id: "user-1".to_string(),
                email: None,
                attributes: serde_json::Value::Null,
            },
        }
    }

    #[test]
    fn test_expires_within_grace_window() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let grace = Duration::from_millis(60_000);

        assert!(session_expiring_at(1_700_000_030).expires_within_at(grace, now));
        assert!(session_expiring_at(1_700_000_060).expires_within_at(grace, now));
        assert!(!session_expiring_at(1_700_000_061).expires_within_at(grace, now));
        assert!(session_expiring_at(1_699_999_000).expires_within_at(grace, now));
    }

    #[test]
    fn test_extreme_expiry_does_not_overflow() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let grace = Duration::from_millis(60_000);

        assert!(session_expiring_at(i64::MIN).expires_within_at(grace, now));
        assert!(session_expiring_at(-1).expires_within_at(grace, now));
        assert!(!session_expiring_at(i64::MAX).expires_within_at(grace, now));
        assert!(session_expiring_at(i64::MAX).expires_within_at(Duration::MAX, now));
    }

    #[test]
    fn test_session_deserializes_supabase_shape() {
        let json = r#"{
            "access_token": "jwt",
            "refresh_token": "r1",
            "expires_at": 1700000000,
            "user": {"id": "u-1", "email": "ana@example.com", "user_metadata": {"name": "Ana"}}
        }"#;

        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.user.id, "u-1");
        assert_eq!(session.user.attributes["name"], "Ana");
        assert_eq!(session.expires_at, 1_700_000_000);
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(AuthOutcome::ok().is_ok());
        let failed = AuthOutcome::failed("Invalid login credentials");
        assert!(!failed.is_ok());
        assert_eq!(failed.error.as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn test_sign_out_scope_strings() {
        assert_eq!(SignOutScope::default().as_str(), "global");
        assert_eq!(SignOutScope::Local.as_str(), "local");
        assert_eq!(SignOutScope::Others.as_str(), "others");
    }
}
