//! Liveness ("pulse") monitoring.
//!
//! The host's network presence and the backend's actual reachability are
//! tracked separately in [`ConnectionState`]: a host can report online while
//! every request to the backend fails.

mod error;
mod monitor;
mod probe;
mod state;

pub use error::{ProbeError, ProbeResult, ProbeVerdict};
pub use monitor::ConnectionMonitor;
pub use probe::ReachabilityProbe;
pub use state::{ConnectionState, Presence};
