//! Route lookup.
//!
//! # Responsibilities
//! - Store service routes in registration order
//! - Look up the route whose prefix matches a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Path prefix matching is case-sensitive, no regex
//! - Longest prefix wins; on an exact prefix collision the first registered wins
//! - O(n) scan (acceptable for typical route counts)

use std::sync::Arc;

use crate::routing::route::ServiceRoute;

#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<ServiceRoute>>,
}

impl RouteTable {
    /// Build the table, dropping routes whose prefix is already taken.
    pub fn new(routes: impl IntoIterator<Item = ServiceRoute>) -> Self {
        let mut table: Vec<Arc<ServiceRoute>> = Vec::new();
        for route in routes {
            if table.iter().any(|r| r.prefix == route.prefix) {
                tracing::warn!(
                    prefix = %route.prefix,
                    upstream = %route.upstream,
                    "Duplicate service prefix, keeping the first registration"
                );
                continue;
            }
            table.push(Arc::new(route));
        }
        Self { routes: table }
    }

    /// Find the most specific route for `path`.
    pub fn match_path(&self, path: &str) -> Option<&Arc<ServiceRoute>> {
        self.routes
            .iter()
            .filter(|r| path.starts_with(r.prefix.as_str()))
            .fold(None, |best: Option<&Arc<ServiceRoute>>, r| match best {
                Some(b) if b.prefix.len() >= r.prefix.len() => Some(b),
                _ => Some(r),
            })
    }

    /// Registered routes in registration order, duplicates already dropped.
    pub fn routes(&self) -> &[Arc<ServiceRoute>] {
        &self.routes
    }
}
