//! Tenant account bootstrap and loading.

use crate::{GatewayError, GatewayResult, SupabaseClient};
use async_trait::async_trait;
use bounded_fetch::{ReqwestTransport, Transport};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use session_manager::{AccountBootstrap, AccountStatus, AuthResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name given to the account created on first login.
pub const DEFAULT_ACCOUNT_NAME: &str = "Minha conta";

/// Membership role of the user who created the account.
pub const OWNER_ROLE: &str = "dono";

const ACCOUNTS_TABLE: &str = "contas";
const MEMBERS_TABLE: &str = "conta_membros";

/// Tenant account visible to the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "criado_em", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "atualizado_em", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Membership {
    id_conta: String,
}

/// REST-backed [`AccountBootstrap`].
pub struct AccountStore<T: Transport = ReqwestTransport> {
    client: Arc<SupabaseClient<T>>,
    current: Mutex<Option<Account>>,
    loads_in_flight: AtomicUsize,
}

struct LoadingGuard<'a> {
    loads_in_flight: &'a AtomicUsize,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loads_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<T: Transport> AccountStore<T> {
    pub fn new(client: Arc<SupabaseClient<T>>) -> Self {
        Self {
            client,
            current: Mutex::new(None),
            loads_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn current_account(&self) -> Option<Account> {
        self.current.lock().clone()
    }

    /// Create an account and owner membership unless the user already
    /// belongs to one.
    async fn ensure_first_login_account(&self, user_id: &str) -> GatewayResult<()> {
        let user_filter = format!("eq.{}", user_id);
        let memberships: Vec<Membership> = self
            .client
            .select(
                MEMBERS_TABLE,
                &[
                    ("select", "id_conta"),
                    ("id_usuario", user_filter.as_str()),
                    ("limit", "1"),
                ],
                None,
            )
            .await?;

        if let Some(membership) = memberships.first() {
            debug!(account_id = %membership.id_conta, "User already has an account");
            return Ok(());
        }

        let created: Vec<Account> = self
            .client
            .insert(ACCOUNTS_TABLE, json!({ "nome": DEFAULT_ACCOUNT_NAME }), None)
            .await?;
        let account = created.into_iter().next().ok_or_else(|| {
            GatewayError::InvalidResponse("account insert returned no rows".to_string())
        })?;

        let _: Vec<serde_json::Value> = self
            .client
            .insert(
                MEMBERS_TABLE,
                json!({
                    "id_conta": account.id,
                    "id_usuario": user_id,
                    "papel": OWNER_ROLE,
                }),
                None,
            )
            .await?;

        info!(user_id = %user_id, account_id = %account.id, "Created first-login account");
        Ok(())
    }

    async fn load_current_account(&self) -> GatewayResult<Option<Account>> {
        let accounts: Vec<Account> = self
            .client
            .select(
                ACCOUNTS_TABLE,
                &[
                    ("select", "id,nome,criado_em,atualizado_em"),
                    ("limit", "1"),
                ],
                None,
            )
            .await?;
        Ok(accounts.into_iter().next())
    }
}

#[async_trait]
impl<T: Transport> AccountBootstrap for AccountStore<T> {
    async fn initialize_account(&self, user_id: &str) -> AuthResult<()> {
        self.loads_in_flight.fetch_add(1, Ordering::SeqCst);
        let _loading = LoadingGuard {
            loads_in_flight: &self.loads_in_flight,
        };

        let loaded = match self.ensure_first_login_account(user_id).await {
            Ok(()) => self.load_current_account().await,
            Err(err) => Err(err),
        };

        match loaded {
            Ok(account) => {
                debug!(account_id = account.as_ref().map(|a| a.id.as_str()), "Account loaded");
                *self.current.lock() = account;
                Ok(())
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "Failed to initialize account");
                *self.current.lock() = None;
                Err(err.into())
            }
        }
    }

    fn clear_current_account(&self) {
        *self.current.lock() = None;
    }

    fn status(&self) -> AccountStatus {
        AccountStatus {
            loaded: self.current.lock().is_some(),
            loading: self.loads_in_flight.load(Ordering::SeqCst) > 0,
        }
    }
}
