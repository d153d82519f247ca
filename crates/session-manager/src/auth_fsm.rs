//! Session lifecycle state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐  InitStarted   ┌─────────────────┐
//! │    Anonymous    │ ─────────────► │  Initializing   │
//! └───┬─────────▲───┘                └────────┬────────┘
//!     │         │ SessionCleared              │ SessionAdopted / SessionCleared
//!     │         │                             ▼
//!     │ SignInStarted            ┌─────────────────────────┐
//!     ▼         │                │      Authenticated      │ ◄── SessionAdopted
//! ┌─────────────┴───┐ Adopted    └──────┬──────────────────┘     (refresh / push)
//! │    SigningIn    │ ────────────────► │ SignOutStarted
//! └─────────────────┘                   ▼
//!                                ┌─────────────────┐
//!                                │   SigningOut    │ ── SessionCleared ──► Anonymous
//!                                └─────────────────┘
//! ```
//!
//! Pushed auth events can adopt or clear a session from any state, so every
//! state accepts `SessionAdopted` and `SessionCleared`.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Anonymous)

    Anonymous => {
        InitStarted => Initializing,
        SignInStarted => SigningIn,
        SessionAdopted => Authenticated,
        SessionCleared => Anonymous
    },
    Initializing => {
        SessionAdopted => Authenticated,
        SessionCleared => Anonymous
    },
    SigningIn => {
        SessionAdopted => Authenticated,
        SessionCleared => Anonymous
    },
    Authenticated => {
        // Refreshed or pushed session replaces the current one
        SessionAdopted => Authenticated,
        SessionCleared => Anonymous,
        SignInStarted => SigningIn,
        SignOutStarted => SigningOut
    },
    SigningOut => {
        SessionCleared => Anonymous,
        // Sign-out failed, session kept
        SessionAdopted => Authenticated
    }
}

pub use session_machine::Input as SessionInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Externally visible session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Anonymous,
    Initializing,
    SigningIn,
    Authenticated,
    SigningOut,
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Anonymous => SessionPhase::Anonymous,
            SessionMachineState::Initializing => SessionPhase::Initializing,
            SessionMachineState::SigningIn => SessionPhase::SigningIn,
            SessionMachineState::Authenticated => SessionPhase::Authenticated,
            SessionMachineState::SigningOut => SessionPhase::SigningOut,
        }
    }
}
