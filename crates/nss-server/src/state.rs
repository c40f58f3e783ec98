//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;
use std::time::Duration;

use nss_cache::SnapshotCache;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The snapshot cache backing every endpoint.
    pub cache: Arc<SnapshotCache>,

    /// Age after which health reports the snapshot as stale.
    pub stale_after: Option<Duration>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(cache: Arc<SnapshotCache>, stale_after: Option<Duration>) -> Self {
        Self { cache, stale_after }
    }

    /// Returns the snapshot cache.
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }
}
