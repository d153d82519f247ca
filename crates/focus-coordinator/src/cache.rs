//! Client-side query cache seam.

use async_trait::async_trait;

/// Fetch status of a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Fetching,
    Paused,
}

/// Selects queries in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryFilter {
    /// Match only queries in this fetch status.
    pub fetch_status: Option<FetchStatus>,
    /// Match only queries with at least one observer.
    pub active_only: bool,
}

impl QueryFilter {
    /// Queries currently mid-fetch.
    pub fn fetching() -> Self {
        Self {
            fetch_status: Some(FetchStatus::Fetching),
            active_only: false,
        }
    }

    /// Queries with at least one observer.
    pub fn active() -> Self {
        Self {
            fetch_status: None,
            active_only: true,
        }
    }

    pub fn matches(&self, status: FetchStatus, is_active: bool) -> bool {
        self.fetch_status.map_or(true, |wanted| wanted == status)
            && (!self.active_only || is_active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefetchOptions {
    /// Cancel a refetch already in flight for the same query before starting.
    pub cancel_refetch: bool,
}

/// Reactive data cache operations used on attention changes.
#[async_trait]
pub trait QueryCache: Send + Sync {
    async fn cancel_queries(&self, filter: QueryFilter);

    async fn refetch_queries(&self, filter: QueryFilter, options: RefetchOptions);
}
