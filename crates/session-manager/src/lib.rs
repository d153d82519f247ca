//! Authentication session management for the Atelier client.
//!
//! This crate provides:
//! - Session and auth-event types shared with provider implementations
//! - The [`AuthProvider`] and [`AccountBootstrap`] collaborator traits
//! - An explicit FSM tracking the session lifecycle
//! - [`SessionManager`]: deduplicated init, serial auth-event handling,
//!   throttled revalidation with proactive refresh, and sign-in/up/out flows

mod auth_fsm;
mod error;
mod provider;
mod session;
mod types;

pub use auth_fsm::session_machine;
pub use auth_fsm::{SessionInput, SessionMachine, SessionMachineState, SessionPhase};
pub use error::{AuthError, AuthErrorKind, AuthResult};
pub use provider::{AccountBootstrap, AccountStatus, AuthProvider};
pub use session::{
    SessionConfig, SessionManager, SessionSnapshot, SessionStateCallback, SIGN_UP_CONFIRMED_MESSAGE,
    SIGN_UP_PENDING_MESSAGE,
};
pub use types::{
    AuthEventKind, AuthOutcome, AuthStateEvent, Session, SignOutScope, SignUpOutcome,
    SignUpRequest, User,
};
