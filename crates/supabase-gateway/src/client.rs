//! Supabase auth and REST client.

use crate::{GatewayError, GatewayResult};
use async_trait::async_trait;
use bounded_fetch::{
    BoundedTransport, CancellationToken, HttpRequest, HttpResponse, ReqwestTransport, Transport,
};
use chrono::Utc;
use parking_lot::Mutex;
use pulse_monitor::{ProbeResult, ReachabilityProbe};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use session_manager::{
    AuthEventKind, AuthProvider, AuthResult, AuthStateEvent, Session, SignOutScope, SignUpOutcome,
    SignUpRequest, User,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

/// Table read by the liveness probe.
pub const DEFAULT_PULSE_TABLE: &str = "perfis";

const EVENT_CHANNEL_CAPACITY: usize = 64;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Pull a human-readable message out of a Supabase error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn encode_query(pairs: &[(&str, &str)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp().saturating_add(self.expires_in));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Supabase client holding the in-memory session.
///
/// Auth-state changes are broadcast to subscribers in the order they
/// happen.
pub struct SupabaseClient<T: Transport = ReqwestTransport> {
    transport: BoundedTransport<T>,
    api_url: String,
    anon_key: String,
    pulse_table: String,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthStateEvent>,
}

impl<T: Transport> SupabaseClient<T> {
    /// Create a new Supabase client.
    ///
    /// `api_url` is the project URL (e.g. `https://xyz.supabase.co`).
    pub fn new(
        api_url: impl Into<String>,
        anon_key: impl Into<String>,
        transport: BoundedTransport<T>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            pulse_table: DEFAULT_PULSE_TABLE.to_string(),
            session: Mutex::new(None),
            events,
        }
    }

    pub fn with_pulse_table(mut self, table: impl Into<String>) -> Self {
        self.pulse_table = table.into();
        self
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, path)
    }

    fn access_token(&self) -> Option<String> {
        self.session.lock().as_ref().map(|s| s.access_token.clone())
    }

    /// Attach `apikey` and the bearer token (user token, else anon key).
    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        let token = self
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", self.anon_key.as_str())
            .header("Accept", "application/json")
            .bearer(&token)
    }

    async fn execute(
        &self,
        request: HttpRequest,
        signal: Option<&CancellationToken>,
    ) -> GatewayResult<HttpResponse> {
        debug!(method = ?request.method, url = %request.url, "Supabase request");
        let response = self.transport.fetch(request, signal).await?;

        if !response.is_success() {
            let body_summary = summarize_response_body(&response.body);
            let message = error_message(&response.body).unwrap_or_else(|| {
                format!(
                    "Request failed with status {} ({})",
                    response.status, body_summary
                )
            });
            error!(status = response.status, body_summary = %body_summary, "Supabase request failed");
            return Err(GatewayError::Api {
                status: response.status,
                message,
            });
        }

        Ok(response)
    }

    /// Select rows from a table. `query` holds PostgREST parameters.
    pub async fn select<R: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
        signal: Option<&CancellationToken>,
    ) -> GatewayResult<Vec<R>> {
        let url = format!("{}?{}", self.rest_url(table), encode_query(query));
        let response = self.execute(self.authorize(HttpRequest::get(url)), signal).await?;
        Ok(response.json()?)
    }

    /// Insert one row and return the stored representation.
    pub async fn insert<R: DeserializeOwned>(
        &self,
        table: &str,
        row: Value,
        signal: Option<&CancellationToken>,
    ) -> GatewayResult<Vec<R>> {
        let request = self
            .authorize(HttpRequest::post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(row);
        let response = self.execute(request, signal).await?;
        Ok(response.json()?)
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> GatewayResult<Session> {
        let url = format!(
            "{}?{}",
            self.auth_url("token"),
            encode_query(&[("grant_type", grant_type)])
        );
        let request = HttpRequest::post(url)
            .header("apikey", self.anon_key.as_str())
            .json(body);
        let response = self.execute(request, None).await?;
        let token: TokenResponse = response.json()?;
        Ok(token.into_session())
    }

    /// Replace the stored session and broadcast the change.
    fn store_session(&self, kind: AuthEventKind, session: Option<Session>) {
        *self.session.lock() = session.clone();
        // No subscribers is fine.
        let _ = self.events.send(AuthStateEvent::new(kind, session));
    }

    /// Parse a signup response: a token bundle when auto-confirmed, the
    /// pending user otherwise.
    fn parse_sign_up(body: &str) -> GatewayResult<SignUpOutcome> {
        let value: Value = serde_json::from_str(body)?;

        if value.get("access_token").is_some() {
            let session = serde_json::from_value::<TokenResponse>(value)?.into_session();
            return Ok(SignUpOutcome {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }

        let user_value = value.get("user").cloned().unwrap_or(value);
        let user: User = serde_json::from_value(user_value)?;
        Ok(SignUpOutcome {
            session: None,
            user: Some(user),
        })
    }
}

#[async_trait]
impl<T: Transport> AuthProvider for SupabaseClient<T> {
    async fn current_session(&self) -> AuthResult<Option<Session>> {
        Ok(self.session.lock().clone())
    }

    async fn refresh_session(&self) -> AuthResult<Option<Session>> {
        let refresh_token = self
            .session
            .lock()
            .as_ref()
            .and_then(|s| s.refresh_token.clone());
        let Some(refresh_token) = refresh_token else {
            debug!("No refresh token, nothing to refresh");
            return Ok(None);
        };

        let session = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        info!(user_id = %session.user.id, expires_at = session.expires_at, "Token refreshed");
        self.store_session(AuthEventKind::TokenRefreshed, Some(session.clone()));
        Ok(Some(session))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session> {
        debug!(email = %email, "Attempting email/password login");
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        self.store_session(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, request: SignUpRequest) -> AuthResult<SignUpOutcome> {
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": {
                "name": request.name,
                "tax_id": request.tax_id,
            },
        });
        let http = HttpRequest::post(self.auth_url("signup"))
            .header("apikey", self.anon_key.as_str())
            .json(body);
        let response = self.execute(http, None).await?;
        let outcome = Self::parse_sign_up(&response.body)?;

        if let Some(session) = &outcome.session {
            self.store_session(AuthEventKind::SignedIn, Some(session.clone()));
        }
        Ok(outcome)
    }

    async fn sign_out(&self, scope: SignOutScope) -> AuthResult<()> {
        let Some(access_token) = self.access_token() else {
            return Ok(());
        };

        let url = format!(
            "{}?{}",
            self.auth_url("logout"),
            encode_query(&[("scope", scope.as_str())])
        );
        let request = HttpRequest::post(url)
            .header("apikey", self.anon_key.as_str())
            .bearer(&access_token);
        let result = self.execute(request, None).await;

        match result {
            Ok(_) => {
                self.store_session(AuthEventKind::SignedOut, None);
                Ok(())
            }
            Err(err) if scope == SignOutScope::Local => {
                warn!(error = %err, "Remote logout failed, clearing local session anyway");
                self.store_session(AuthEventKind::SignedOut, None);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> AuthResult<()> {
        let url = match redirect_to {
            Some(redirect_to) => format!(
                "{}?{}",
                self.auth_url("recover"),
                encode_query(&[("redirect_to", redirect_to)])
            ),
            None => self.auth_url("recover"),
        };
        let request = HttpRequest::post(url)
            .header("apikey", self.anon_key.as_str())
            .json(json!({ "email": email }));
        self.execute(request, None).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl<T: Transport> ReachabilityProbe for SupabaseClient<T> {
    async fn probe(&self) -> ProbeResult<()> {
        let url = format!("{}?select=id&limit=1", self.rest_url(&self.pulse_table));
        self.execute(self.authorize(HttpRequest::get(url)), None)
            .await?;
        Ok(())
    }
}
