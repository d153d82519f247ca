//! Navigation guard.

use crate::{Redirect, RouteTarget};
use session_manager::SessionManager;
use std::sync::Arc;
use tracing::debug;

/// Result of guarding a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Redirect),
}

/// Runs before every navigation.
pub struct RouteGuard {
    session: Arc<SessionManager>,
    login_path: String,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionManager>, login_path: impl Into<String>) -> Self {
        Self {
            session,
            login_path: login_path.into(),
        }
    }

    /// Wait for session init, then send anonymous users on protected routes
    /// to the login surface. Authenticated users get their account loaded if
    /// it is not already.
    pub async fn before_each(&self, target: &RouteTarget) -> GuardDecision {
        self.session.init().await;

        if !target.requires_auth {
            return GuardDecision::Proceed;
        }

        match self.session.user() {
            None => {
                debug!(to = %target.full_path, "No session, redirecting to login");
                GuardDecision::Redirect(Redirect::to_login(&self.login_path, &target.full_path))
            }
            Some(user) => {
                self.session.ensure_account_loaded(&user.id).await;
                GuardDecision::Proceed
            }
        }
    }
}
