//! Host-side implementations of the navigation and query-cache seams.

use async_trait::async_trait;
use focus_coordinator::{
    Navigator, QueryCache, QueryFilter, Redirect, RefetchOptions, RouteTable, RouteTarget,
};
use parking_lot::Mutex;
use tracing::info;

/// Query cache for a host without a data layer: records the requested
/// operations in the log.
pub struct TracingQueryCache;

#[async_trait]
impl QueryCache for TracingQueryCache {
    async fn cancel_queries(&self, filter: QueryFilter) {
        info!(?filter, "Cancel queries");
    }

    async fn refetch_queries(&self, filter: QueryFilter, options: RefetchOptions) {
        info!(?filter, cancel_refetch = options.cancel_refetch, "Refetch queries");
    }
}

/// Tracks the current route of the host.
pub struct HostNavigator {
    routes: RouteTable,
    current: Mutex<RouteTarget>,
}

impl HostNavigator {
    pub fn new(routes: RouteTable, initial_path: &str) -> Self {
        let current = routes.resolve(initial_path);
        Self {
            routes,
            current: Mutex::new(current),
        }
    }

    pub fn resolve(&self, full_path: &str) -> RouteTarget {
        self.routes.resolve(full_path)
    }

    pub fn commit(&self, target: RouteTarget) {
        info!(to = %target.full_path, "Navigated");
        *self.current.lock() = target;
    }

    pub fn current_path(&self) -> String {
        self.current.lock().full_path.clone()
    }
}

impl Navigator for HostNavigator {
    fn current_route(&self) -> Option<RouteTarget> {
        Some(self.current.lock().clone())
    }

    fn redirect(&self, redirect: Redirect) {
        let location = redirect.location();
        info!(to = %location, "Redirected");
        *self.current.lock() = self.routes.resolve(&location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_moves_to_login_with_return_target() {
        let navigator = HostNavigator::new(RouteTable::default(), "/app/pedidos");
        assert!(navigator.current_route().unwrap().requires_auth);

        navigator.redirect(Redirect::to_login("/login", "/app/pedidos"));

        let current = navigator.current_route().unwrap();
        assert_eq!(current.full_path, "/login?redirect=%2Fapp%2Fpedidos");
        assert!(!current.requires_auth);
    }

    #[test]
    fn test_commit_updates_current_route() {
        let navigator = HostNavigator::new(RouteTable::default(), "/");

        navigator.commit(navigator.resolve("/app/clientes"));

        assert_eq!(navigator.current_path(), "/app/clientes");
    }
}
