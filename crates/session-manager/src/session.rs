//! Session manager: owns the authentication session and its lifecycle.

use crate::{
    AccountBootstrap, AuthEventKind, AuthOutcome, AuthProvider, AuthResult, AuthStateEvent,
    Session, SessionInput, SessionMachine, SessionPhase, SignOutScope, SignUpRequest, User,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Returned by sign-up when the provider confirmed the account immediately.
pub const SIGN_UP_CONFIRMED_MESSAGE: &str = "Account created and signed in.";
/// Returned by sign-up when the user must confirm by email first.
pub const SIGN_UP_PENDING_MESSAGE: &str = "Account created. Check your email to confirm access.";

/// Callback invoked on every phase change with the new phase and user id.
pub type SessionStateCallback = Box<dyn Fn(SessionPhase, Option<&str>) + Send + Sync>;

/// Timing knobs for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Minimum spacing between two revalidation attempts.
    pub revalidate_min_interval: Duration,
    /// Sessions expiring within this window are refreshed proactively.
    pub refresh_grace: Duration,
    /// Where password-reset emails send the user back to.
    pub password_reset_redirect: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            revalidate_min_interval: Duration::from_millis(15_000),
            refresh_grace: Duration::from_millis(60_000),
            password_reset_redirect: None,
        }
    }
}

/// Point-in-time view of the manager state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub session: Option<Session>,
    pub user: Option<User>,
    pub loading: bool,
}

/// Owns the current session and coordinates it with the auth provider.
///
/// All public operations absorb failures: auth flows return an
/// [`AuthOutcome`], revalidation returns a bool, and init never fails.
pub struct SessionManager {
    provider: Arc<dyn AuthProvider>,
    account: Arc<dyn AccountBootstrap>,
    config: SessionConfig,
    session: Mutex<Option<Session>>,
    fsm: Mutex<SessionMachine>,
    in_flight: AtomicUsize,
    init_guard: OnceCell<()>,
    last_revalidate_at: Mutex<Option<Instant>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    state_callback: Mutex<Option<SessionStateCallback>>,
}

/// Keeps the loading flag raised while alive.
struct LoadingGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        account: Arc<dyn AccountBootstrap>,
        config: SessionConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            account,
            config,
            session: Mutex::new(None),
            fsm: Mutex::new(SessionMachine::new()),
            in_flight: AtomicUsize::new(0),
            init_guard: OnceCell::new(),
            last_revalidate_at: Mutex::new(None),
            listener: Mutex::new(None),
            state_callback: Mutex::new(None),
        })
    }

    /// Set a callback to be notified of phase changes.
    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        *self.state_callback.lock() = Some(callback);
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.fsm.lock().state())
    }

    pub fn session(&self) -> Option<Session> {
        self.session.lock().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.session.lock().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session();
        SessionSnapshot {
            phase: self.phase(),
            user: session.as_ref().map(|s| s.user.clone()),
            session,
            loading: self.is_loading(),
        }
    }

    /// Initialize the session once for the lifetime of the manager.
    ///
    /// Concurrent and later callers await the same attempt and return only
    /// after it has completed.
    pub async fn init(self: &Arc<Self>) {
        self.init_guard.get_or_init(|| self.run_init()).await;
    }

    async fn run_init(self: &Arc<Self>) {
        let _loading = self.begin_loading();
        self.advance(SessionInput::InitStarted);

        // Subscribe first so pushes during the fetch are queued, not lost.
        let events = self.provider.subscribe();

        match self.provider.current_session().await {
            Ok(Some(session)) => {
                let user_id = session.user.id.clone();
                info!(user_id = %user_id, "Session restored");
                self.adopt(Some(session));
                self.ensure_account_loaded(&user_id).await;
            }
            Ok(None) => {
                debug!("No session on init");
                self.adopt(None);
                self.account.clear_current_account();
            }
            Err(err) => {
                warn!(error = %err, "Failed to fetch initial session");
                self.adopt(None);
            }
        }

        self.spawn_listener(events);
    }

    fn spawn_listener(self: &Arc<Self>, mut events: broadcast::Receiver<AuthStateEvent>) {
        let manager: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(manager) = manager.upgrade() else {
                            break;
                        };
                        manager.handle_auth_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth event listener lagged");
                        let Some(manager) = manager.upgrade() else {
                            break;
                        };
                        manager.resync_session().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Auth event listener stopped");
        });
        *self.listener.lock() = Some(handle);
    }

    /// Re-read the provider's session after auth events were missed.
    async fn resync_session(&self) {
        match self.provider.current_session().await {
            Ok(Some(session)) => {
                let user_id = session.user.id.clone();
                debug!(user_id = %user_id, "Session re-read after missed events");
                self.adopt(Some(session));
                self.ensure_account_loaded(&user_id).await;
            }
            Ok(None) => {
                debug!("No session after missed events");
                self.clear_local_state();
            }
            Err(err) => warn!(error = %err, "Failed to re-read session after missed events"),
        }
    }

    /// Apply a pushed auth-state change.
    pub async fn handle_auth_event(&self, event: AuthStateEvent) {
        debug!(kind = ?event.kind, has_session = event.session.is_some(), "Auth state change");
        let user_id = event.session.as_ref().map(|s| s.user.id.clone());
        self.adopt(event.session);

        match (event.kind, user_id) {
            (AuthEventKind::SignedOut, _) | (_, None) => self.account.clear_current_account(),
            (AuthEventKind::SignedIn | AuthEventKind::UserUpdated, Some(user_id)) => {
                self.ensure_account_loaded(&user_id).await;
            }
            _ => {}
        }
    }

    /// Initialize the account for `user_id` unless one is loaded or loading.
    ///
    /// A failed bootstrap clears the account state.
    pub async fn ensure_account_loaded(&self, user_id: &str) {
        if !self.account.status().needs_initialization() {
            debug!(user_id = %user_id, "Account already loaded or loading");
            return;
        }
        if let Err(err) = self.account.initialize_account(user_id).await {
            warn!(user_id = %user_id, error = %err, "Account bootstrap failed");
            self.account.clear_current_account();
        }
    }

    /// Re-confirm the session, refreshing it when close to expiry.
    ///
    /// Returns true when the user must authenticate again. Calls within the
    /// minimum interval of the previous attempt return false immediately.
    pub async fn revalidate_session(&self) -> bool {
        if !self.claim_revalidation_slot() {
            debug!("Revalidation throttled");
            return false;
        }

        match self.try_revalidate().await {
            Ok(reauth_required) => reauth_required,
            Err(err) => {
                warn!(error = %err, "Session revalidation failed");
                false
            }
        }
    }

    /// Check and stamp the throttle under one lock.
    fn claim_revalidation_slot(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_revalidate_at.lock();
        if let Some(previous) = *last {
            if now.duration_since(previous) < self.config.revalidate_min_interval {
                return false;
            }
        }
        *last = Some(now);
        true
    }

    async fn try_revalidate(&self) -> AuthResult<bool> {
        let Some(session) = self.provider.current_session().await? else {
            info!("No session on revalidation, re-auth required");
            self.clear_local_state();
            return Ok(true);
        };

        let session = if session.expires_within(self.config.refresh_grace) {
            debug!(user_id = %session.user.id, "Session near expiry, refreshing");
            match self.provider.refresh_session().await {
                Ok(Some(refreshed)) => {
                    info!(user_id = %refreshed.user.id, "Session refreshed");
                    refreshed
                }
                Ok(None) => {
                    warn!("Refresh returned no session");
                    self.abandon_session().await;
                    return Ok(true);
                }
                Err(err) => {
                    warn!(error = %err, "Session refresh failed");
                    self.abandon_session().await;
                    return Ok(true);
                }
            }
        } else {
            session
        };

        let user_id = session.user.id.clone();
        self.adopt(Some(session));
        self.ensure_account_loaded(&user_id).await;
        Ok(false)
    }

    /// Best-effort local sign-out followed by clearing local state.
    async fn abandon_session(&self) {
        if let Err(err) = self.provider.sign_out(SignOutScope::Local).await {
            debug!(error = %err, "Local sign-out failed");
        }
        self.clear_local_state();
    }

    fn clear_local_state(&self) {
        self.adopt(None);
        self.account.clear_current_account();
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthOutcome {
        let _loading = self.begin_loading();
        self.advance(SessionInput::SignInStarted);

        match self.provider.sign_in_with_password(email, password).await {
            Ok(session) => {
                info!(user_id = %session.user.id, "Signed in");
                self.adopt(Some(session));
                AuthOutcome::ok()
            }
            Err(err) => {
                warn!(error = %err, "Sign-in failed");
                self.settle();
                AuthOutcome::failed(err)
            }
        }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> AuthOutcome {
        let _loading = self.begin_loading();
        self.advance(SessionInput::SignInStarted);

        match self.provider.sign_up(request).await {
            Ok(outcome) => match outcome.session {
                Some(session) => {
                    info!(user_id = %session.user.id, "Signed up and confirmed");
                    self.adopt(Some(session));
                    AuthOutcome::ok_with_message(SIGN_UP_CONFIRMED_MESSAGE)
                }
                None => {
                    info!(
                        user_id = outcome.user.as_ref().map(|u| u.id.as_str()),
                        "Signed up, confirmation pending"
                    );
                    self.settle();
                    AuthOutcome::ok_with_message(SIGN_UP_PENDING_MESSAGE)
                }
            },
            Err(err) => {
                warn!(error = %err, "Sign-up failed");
                self.settle();
                AuthOutcome::failed(err)
            }
        }
    }

    pub async fn sign_out(&self) -> AuthOutcome {
        let _loading = self.begin_loading();
        self.advance(SessionInput::SignOutStarted);

        match self.provider.sign_out(SignOutScope::Global).await {
            Ok(()) => {
                info!("Signed out");
                self.clear_local_state();
                AuthOutcome::ok()
            }
            Err(err) => {
                warn!(error = %err, "Sign-out failed");
                self.settle();
                AuthOutcome::failed(err)
            }
        }
    }

    pub async fn reset_password(&self, email: &str) -> AuthOutcome {
        let _loading = self.begin_loading();
        let redirect_to = self.config.password_reset_redirect.as_deref();

        match self.provider.reset_password_for_email(email, redirect_to).await {
            Ok(()) => {
                info!("Password reset email requested");
                AuthOutcome::ok()
            }
            Err(err) => {
                warn!(error = %err, "Password reset request failed");
                AuthOutcome::failed(err)
            }
        }
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        LoadingGuard {
            in_flight: &self.in_flight,
        }
    }

    /// Replace the session wholesale and move the FSM accordingly.
    fn adopt(&self, session: Option<Session>) {
        let input = if session.is_some() {
            SessionInput::SessionAdopted
        } else {
            SessionInput::SessionCleared
        };
        *self.session.lock() = session;
        self.advance(input);
    }

    /// Return the FSM to the phase matching the stored session.
    fn settle(&self) {
        let input = if self.is_authenticated() {
            SessionInput::SessionAdopted
        } else {
            SessionInput::SessionCleared
        };
        self.advance(input);
    }

    fn advance(&self, input: SessionInput) {
        let mut fsm = self.fsm.lock();
        let old_phase = SessionPhase::from(fsm.state());

        if fsm.consume(&input).is_err() {
            debug!(?input, phase = ?old_phase, "Ignoring impossible session transition");
            return;
        }

        let new_phase = SessionPhase::from(fsm.state());
        drop(fsm);

        if old_phase != new_phase {
            debug!(from = ?old_phase, to = ?new_phase, "Session phase changed");
            self.notify(new_phase);
        }
    }

    fn notify(&self, phase: SessionPhase) {
        let user_id = self.session.lock().as_ref().map(|s| s.user.id.clone());
        if let Some(callback) = self.state_callback.lock().as_ref() {
            callback(phase, user_id.as_deref());
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.abort();
        }
    }
}
