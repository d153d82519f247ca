//! Fakes shared by the coordinator and guard tests.

use crate::{
    FocusCoordinator, Navigator, QueryCache, QueryFilter, Redirect, RefetchOptions, RouteTable,
    RouteTarget,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use pulse_monitor::{ConnectionMonitor, ProbeResult, ReachabilityProbe};
use session_manager::{
    AccountBootstrap, AccountStatus, AuthError, AuthProvider, AuthResult, AuthStateEvent, Session,
    SessionConfig, SessionManager, SignOutScope, SignUpOutcome, SignUpRequest, User,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub(crate) type Journal = Arc<Mutex<Vec<&'static str>>>;

pub(crate) fn session_for(user_id: &str, expires_in_secs: i64) -> Session {
    Session {
        access_token: format!("access-{}", user_id),
        refresh_token: Some(format!("refresh-{}", user_id)),
        expires_at: Utc::now().timestamp() + expires_in_secs,
        user: User {
            id: user_id.to_string(),
            email: None,
            attributes: serde_json::Value::Null,
        },
    }
}

pub(crate) struct FakeProvider {
    session: Mutex<Option<Session>>,
    fetch_calls: AtomicUsize,
    events: broadcast::Sender<AuthStateEvent>,
}

impl FakeProvider {
    pub(crate) fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for FakeProvider {
    async fn current_session(&self) -> AuthResult<Option<Session>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.session.lock().clone())
    }

    async fn refresh_session(&self) -> AuthResult<Option<Session>> {
        Ok(None)
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> AuthResult<Session> {
        Err(AuthError::Rejected("Invalid login credentials".to_string()))
    }

    async fn sign_up(&self, _request: SignUpRequest) -> AuthResult<SignUpOutcome> {
        Ok(SignUpOutcome::default())
    }

    async fn sign_out(&self, _scope: SignOutScope) -> AuthResult<()> {
        *self.session.lock() = None;
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        _email: &str,
        _redirect_to: Option<&str>,
    ) -> AuthResult<()> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub(crate) struct FakeAccount {
    pub(crate) loaded: AtomicBool,
    pub(crate) fail: AtomicBool,
    pub(crate) init_calls: AtomicUsize,
}

#[async_trait]
impl AccountBootstrap for FakeAccount {
    async fn initialize_account(&self, _user_id: &str) -> AuthResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthError::Network("connection reset".to_string()));
        }
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn clear_current_account(&self) {
        self.loaded.store(false, Ordering::SeqCst);
    }

    fn status(&self) -> AccountStatus {
        AccountStatus {
            loaded: self.loaded.load(Ordering::SeqCst),
            loading: false,
        }
    }
}

pub(crate) struct RecordingCache {
    journal: Journal,
}

#[async_trait]
impl QueryCache for RecordingCache {
    async fn cancel_queries(&self, filter: QueryFilter) {
        assert_eq!(filter, QueryFilter::fetching());
        self.journal.lock().push("cancel:fetching");
    }

    async fn refetch_queries(&self, filter: QueryFilter, options: RefetchOptions) {
        assert_eq!(filter, QueryFilter::active());
        assert!(options.cancel_refetch);
        self.journal.lock().push("refetch:active:cancel_refetch");
    }
}

pub(crate) struct RecordingNavigator {
    current: RouteTarget,
    redirects: Mutex<Vec<Redirect>>,
}

impl RecordingNavigator {
    pub(crate) fn redirects(&self) -> Vec<Redirect> {
        self.redirects.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_route(&self) -> Option<RouteTarget> {
        Some(self.current.clone())
    }

    fn redirect(&self, redirect: Redirect) {
        self.redirects.lock().push(redirect);
    }
}

struct RecordingProbe {
    journal: Journal,
}

#[async_trait]
impl ReachabilityProbe for RecordingProbe {
    async fn probe(&self) -> ProbeResult<()> {
        self.journal.lock().push("pulse");
        Ok(())
    }
}

pub(crate) struct Harness {
    pub(crate) provider: Arc<FakeProvider>,
    pub(crate) account: Arc<FakeAccount>,
    pub(crate) session: Arc<SessionManager>,
    pub(crate) navigator: Arc<RecordingNavigator>,
    pub(crate) coordinator: Arc<FocusCoordinator>,
    journal: Journal,
}

impl Harness {
    pub(crate) fn new(session: Option<Session>, current_path: &str) -> Self {
        let journal: Journal = Arc::default();
        let (events, _) = broadcast::channel(16);
        let provider = Arc::new(FakeProvider {
            session: Mutex::new(session),
            fetch_calls: AtomicUsize::new(0),
            events,
        });
        let account = Arc::new(FakeAccount::default());
        let session =
            SessionManager::new(provider.clone(), account.clone(), SessionConfig::default());
        let navigator = Arc::new(RecordingNavigator {
            current: RouteTable::default().resolve(current_path),
            redirects: Mutex::new(Vec::new()),
        });
        let monitor = ConnectionMonitor::new(
            Arc::new(RecordingProbe {
                journal: journal.clone(),
            }),
            Duration::from_millis(60_000),
        );
        let coordinator = Arc::new(FocusCoordinator::new(
            session.clone(),
            Arc::new(RecordingCache {
                journal: journal.clone(),
            }),
            navigator.clone(),
            monitor,
            "/login",
        ));

        Self {
            provider,
            account,
            session,
            navigator,
            coordinator,
            journal,
        }
    }

    pub(crate) fn journal(&self) -> Vec<&'static str> {
        self.journal.lock().clone()
    }

    pub(crate) fn clear_journal(&self) {
        self.journal.lock().clear();
    }
}
