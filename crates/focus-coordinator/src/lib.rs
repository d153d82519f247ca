//! Focus and visibility coordination.
//!
//! When the app regains attention its token and its cached data may both be
//! stale. [`FocusCoordinator`] revalidates the session first, then either
//! redirects to the login surface or resynchronizes the query cache and
//! confirms backend liveness.
//!
//! [`RouteGuard`] applies the same session rules on navigation.

mod cache;
mod coordinator;
mod guard;
mod navigation;

#[cfg(test)]
mod test_support;

pub use cache::{FetchStatus, QueryCache, QueryFilter, RefetchOptions};
pub use coordinator::{AttentionEvent, FocusCoordinator, FocusOutcome};
pub use guard::{GuardDecision, RouteGuard};
pub use navigation::{Navigator, Redirect, RouteTable, RouteTarget, DEFAULT_LOGIN_PATH};
