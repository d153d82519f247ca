//! Collaborator traits the session manager depends on.

use crate::{AuthResult, AuthStateEvent, Session, SignOutScope, SignUpOutcome, SignUpRequest};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Hosted authentication provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The provider's current session, if any.
    async fn current_session(&self) -> AuthResult<Option<Session>>;

    /// Exchange the refresh token for a new session.
    ///
    /// `Ok(None)` means there was nothing to refresh.
    async fn refresh_session(&self) -> AuthResult<Option<Session>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session>;

    async fn sign_up(&self, request: SignUpRequest) -> AuthResult<SignUpOutcome>;

    async fn sign_out(&self, scope: SignOutScope) -> AuthResult<()>;

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>)
        -> AuthResult<()>;

    /// Subscribe to auth-state changes. Events are delivered in the order the
    /// provider emits them.
    fn subscribe(&self) -> broadcast::Receiver<AuthStateEvent>;
}

/// Observable state of the tenant account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountStatus {
    pub loaded: bool,
    pub loading: bool,
}

impl AccountStatus {
    /// True when neither a loaded account nor an in-flight load exists.
    pub fn needs_initialization(&self) -> bool {
        !self.loaded && !self.loading
    }
}

/// First-login account provisioning and loading.
#[async_trait]
pub trait AccountBootstrap: Send + Sync {
    async fn initialize_account(&self, user_id: &str) -> AuthResult<()>;

    fn clear_current_account(&self);

    fn status(&self) -> AccountStatus;
}
