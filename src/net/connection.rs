//! Bridge session lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Count live WebSocket bridges
//! - Release the slot exactly once, on every exit path (guard drop)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;

/// Global atomic counter for session IDs.
/// Relaxed ordering is enough: only uniqueness matters.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bridge-{}", self.0)
    }
}

/// Tracks active bridges. Cheap to clone; clones share the count.
#[derive(Debug, Clone, Default)]
pub struct BridgeTracker {
    active_count: Arc<AtomicU64>,
}

impl BridgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new bridge. The returned guard releases it on drop.
    pub fn track(&self) -> BridgeGuard {
        let active = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_bridges(active);
        BridgeGuard {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::new(),
        }
    }

    /// Current count of live bridges.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until no bridge is live. Returns false on timeout.
    pub async fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.active_count() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}

/// Guard that tracks a bridge's lifetime.
#[derive(Debug)]
pub struct BridgeGuard {
    active_count: Arc<AtomicU64>,
    id: SessionId,
}

impl BridgeGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for BridgeGuard {
    fn drop(&mut self) {
        let remaining = self.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_active_bridges(remaining);
        tracing::trace!(session = %self.id, "Bridge released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn bridge_tracker_counts() {
        let tracker = BridgeTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.clone().track();
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn wait_for_idle_times_out_while_held() {
        let tracker = BridgeTracker::new();
        let guard = tracker.track();
        assert!(!tracker.wait_for_idle(Duration::from_millis(50)).await);
        drop(guard);
        assert!(tracker.wait_for_idle(Duration::from_millis(50)).await);
    }
}
