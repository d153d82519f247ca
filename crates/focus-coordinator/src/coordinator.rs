//! Attention-change handling.

use crate::{Navigator, QueryCache, QueryFilter, Redirect, RefetchOptions};
use pulse_monitor::ConnectionMonitor;
use session_manager::SessionManager;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Platform attention event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionEvent {
    WindowFocused,
    BecameVisible,
    BecameHidden,
}

/// What happened when attention came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Re-auth was required on a protected route; nothing was refetched.
    Redirected(Redirect),
    /// Stale queries were cancelled and active ones refetched.
    Resynced { pulse_healthy: bool },
}

pub struct FocusCoordinator {
    session: Arc<SessionManager>,
    cache: Arc<dyn QueryCache>,
    navigator: Arc<dyn Navigator>,
    monitor: Arc<ConnectionMonitor>,
    login_path: String,
}

impl FocusCoordinator {
    pub fn new(
        session: Arc<SessionManager>,
        cache: Arc<dyn QueryCache>,
        navigator: Arc<dyn Navigator>,
        monitor: Arc<ConnectionMonitor>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            session,
            cache,
            navigator,
            monitor,
            login_path: login_path.into(),
        }
    }

    /// Revalidate, then either redirect to login or resync the cache and
    /// confirm liveness.
    pub async fn on_attention_regained(&self) -> FocusOutcome {
        let reauth_required = self.session.revalidate_session().await;

        if reauth_required {
            if let Some(route) = self.navigator.current_route().filter(|r| r.requires_auth) {
                let redirect = Redirect::to_login(&self.login_path, &route.full_path);
                info!(from = %route.full_path, "Session lost, redirecting to login");
                self.navigator.redirect(redirect.clone());
                return FocusOutcome::Redirected(redirect);
            }
        }

        self.cache.cancel_queries(QueryFilter::fetching()).await;
        self.cache
            .refetch_queries(
                QueryFilter::active(),
                RefetchOptions {
                    cancel_refetch: true,
                },
            )
            .await;

        let pulse_healthy = self.monitor.check_pulse().await;
        debug!(pulse_healthy, "Resynced after regaining attention");
        FocusOutcome::Resynced { pulse_healthy }
    }

    /// Cancel mid-fetch queries without refetching.
    pub async fn on_attention_lost(&self) {
        debug!("Attention lost, cancelling in-flight queries");
        self.cache.cancel_queries(QueryFilter::fetching()).await;
    }

    pub async fn handle(&self, event: AttentionEvent) -> Option<FocusOutcome> {
        match event {
            AttentionEvent::WindowFocused | AttentionEvent::BecameVisible => {
                Some(self.on_attention_regained().await)
            }
            AttentionEvent::BecameHidden => {
                self.on_attention_lost().await;
                None
            }
        }
    }

    /// Handle attention events serially until the channel closes or
    /// `cancel` fires.
    pub fn spawn_listener(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<AttentionEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            coordinator.handle(event).await;
                        }
                        None => break,
                    },
                }
            }
            debug!("Attention listener stopped");
        })
    }
}
