//! Application wiring and command handlers.

use crate::events::PlatformEvent;
use crate::host::{HostNavigator, TracingQueryCache};
use anyhow::Result;
use atelier_config::Config;
use bounded_fetch::{BoundedTransport, ReqwestTransport};
use focus_coordinator::{
    AttentionEvent, FocusCoordinator, GuardDecision, Navigator, RouteGuard, RouteTable,
};
use pulse_monitor::{ConnectionMonitor, ConnectionState, Presence};
use serde::Serialize;
use session_manager::{
    AuthOutcome, SessionConfig, SessionManager, SessionPhase, SignUpRequest,
};
use std::sync::Arc;
use supabase_gateway::{Account, AccountStore, SupabaseClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const EVENT_QUEUE_CAPACITY: usize = 32;

/// Process-wide singletons.
pub struct App {
    accounts: Arc<AccountStore>,
    session: Arc<SessionManager>,
    monitor: Arc<ConnectionMonitor>,
    navigator: Arc<HostNavigator>,
    coordinator: Arc<FocusCoordinator>,
    guard: RouteGuard,
}

/// Printed by `status`; never includes tokens.
#[derive(Serialize)]
struct StatusReport {
    phase: SessionPhase,
    user_id: Option<String>,
    email: Option<String>,
    expires_at: Option<i64>,
    loading: bool,
    account: Option<Account>,
    connection: ConnectionState,
    route: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl App {
    pub fn build(config: &Config) -> Result<Self> {
        let transport =
            BoundedTransport::with_timeout(ReqwestTransport::new(), config.request_timeout());
        let client = Arc::new(
            SupabaseClient::new(
                config.supabase_url()?.as_str(),
                config.supabase_anon_key.as_str(),
                transport,
            )
            .with_pulse_table(config.pulse_table.as_str()),
        );
        let accounts = Arc::new(AccountStore::new(client.clone()));

        let session = SessionManager::new(
            client.clone(),
            accounts.clone(),
            SessionConfig {
                revalidate_min_interval: config.revalidate_min_interval(),
                refresh_grace: config.refresh_grace(),
                password_reset_redirect: config.password_reset_redirect(),
            },
        );
        let monitor = ConnectionMonitor::new(client, config.pulse_interval());
        let navigator = Arc::new(HostNavigator::new(RouteTable::default(), "/"));
        let coordinator = Arc::new(FocusCoordinator::new(
            session.clone(),
            Arc::new(TracingQueryCache),
            navigator.clone(),
            monitor.clone(),
            config.login_path.as_str(),
        ));
        let guard = RouteGuard::new(session.clone(), config.login_path.as_str());

        Ok(Self {
            accounts,
            session,
            monitor,
            navigator,
            coordinator,
            guard,
        })
    }

    /// Initialize, start the heartbeat, then process stdin events until EOF
    /// or Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        self.session.init().await;
        info!(phase = ?self.session.phase(), "Session initialized");

        let cancel = CancellationToken::new();
        let heartbeat = self.monitor.spawn_heartbeat(cancel.clone());

        let (presence_tx, presence_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let presence = self
            .monitor
            .spawn_presence_listener(presence_rx, cancel.clone());

        let (attention_tx, attention_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let attention = self
            .coordinator
            .spawn_listener(attention_rx, cancel.clone());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, shutting down");
                    break;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("Input closed, shutting down");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<PlatformEvent>() {
                        Ok(event) => self.dispatch(event, &presence_tx, &attention_tx).await?,
                        Err(err) => warn!(error = %err, "Ignoring input line"),
                    }
                }
            }
        }

        cancel.cancel();
        drop(presence_tx);
        drop(attention_tx);
        for handle in [heartbeat, presence, attention] {
            if let Err(err) = handle.await {
                warn!(error = %err, "Background task ended abnormally");
            }
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        event: PlatformEvent,
        presence_tx: &mpsc::Sender<Presence>,
        attention_tx: &mpsc::Sender<AttentionEvent>,
    ) -> Result<()> {
        match event {
            PlatformEvent::Attention(attention) => attention_tx.send(attention).await?,
            PlatformEvent::Presence(presence) => presence_tx.send(presence).await?,
            PlatformEvent::Navigate(path) => self.navigate(&path).await,
            PlatformEvent::Login { email, password } => {
                print_json(&self.session.sign_in(&email, &password).await)?
            }
            PlatformEvent::Logout => print_json(&self.session.sign_out().await)?,
            PlatformEvent::Status => print_json(&self.status())?,
            PlatformEvent::Pulse => {
                self.monitor.check_pulse().await;
                print_json(&self.monitor.state())?
            }
        }
        Ok(())
    }

    async fn navigate(&self, path: &str) {
        let target = self.navigator.resolve(path);
        match self.guard.before_each(&target).await {
            GuardDecision::Proceed => self.navigator.commit(target),
            GuardDecision::Redirect(redirect) => self.navigator.redirect(redirect),
        }
    }

    fn status(&self) -> StatusReport {
        let snapshot = self.session.snapshot();
        let route = self
            .navigator
            .current_route()
            .map(|r| r.full_path)
            .unwrap_or_default();

        StatusReport {
            phase: snapshot.phase,
            user_id: snapshot.user.as_ref().map(|u| u.id.clone()),
            email: snapshot.user.as_ref().and_then(|u| u.email.clone()),
            expires_at: snapshot.session.as_ref().map(|s| s.expires_at),
            loading: snapshot.loading,
            account: self.accounts.current_account(),
            connection: self.monitor.state(),
            route,
        }
    }

    pub async fn pulse(&self) -> Result<()> {
        self.monitor.check_pulse().await;
        print_json(&self.monitor.state())
    }

    pub async fn sign_up(
        &self,
        email: String,
        password: String,
        name: String,
        tax_id: String,
    ) -> Result<()> {
        let outcome = self
            .session
            .sign_up(SignUpRequest {
                email,
                password,
                name,
                tax_id,
            })
            .await;
        report(&outcome)
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        let outcome = self.session.reset_password(email).await;
        report(&outcome)
    }
}

/// Print an auth outcome, failing the command when it carries an error.
fn report(outcome: &AuthOutcome) -> Result<()> {
    print_json(outcome)?;
    match &outcome.error {
        Some(error) => Err(anyhow::anyhow!("{}", error)),
        None => Ok(()),
    }
}
