//! Supabase gateway.
//!
//! Concrete implementations of the collaborator traits over the Supabase
//! REST and auth APIs:
//! - [`SupabaseClient`]: [`session_manager::AuthProvider`] and
//!   [`pulse_monitor::ReachabilityProbe`]
//! - [`AccountStore`]: [`session_manager::AccountBootstrap`]
//!
//! Every request goes through [`bounded_fetch::BoundedTransport`].

mod account;
mod client;
mod error;

#[cfg(test)]
mod test_support;

pub use account::{Account, AccountStore, DEFAULT_ACCOUNT_NAME, OWNER_ROLE};
pub use client::{SupabaseClient, DEFAULT_PULSE_TABLE};
pub use error::{GatewayError, GatewayResult};
