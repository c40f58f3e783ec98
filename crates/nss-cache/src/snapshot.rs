//! Published snapshots.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nss_model::{AccountRecord, GroupRecord, ShadowRecord};
use serde::Serialize;

/// One consistent view of the directory.
///
/// Never mutated after construction; a refresh publishes a new snapshot
/// and the old one is dropped once its last reader lets go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Account records, in directory order.
    pub accounts: Arc<[AccountRecord]>,
    /// Group records, in directory order.
    pub groups: Arc<[GroupRecord]>,
    /// Shadow records, in directory order.
    pub shadow: Arc<[ShadowRecord]>,
    /// When the data was fetched. `None` for the empty startup snapshot.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The snapshot held before the first successful refresh.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            accounts: Arc::from([]),
            groups: Arc::from([]),
            shadow: Arc::from([]),
            fetched_at: None,
        }
    }

    /// Creates a snapshot stamped with the current time.
    #[must_use]
    pub fn new(
        accounts: Vec<AccountRecord>,
        groups: Vec<GroupRecord>,
        shadow: Vec<ShadowRecord>,
    ) -> Self {
        Self {
            accounts: accounts.into(),
            groups: groups.into(),
            shadow: shadow.into(),
            fetched_at: Some(Utc::now()),
        }
    }

    /// Returns the collection sizes and fetch time.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            accounts: self.accounts.len(),
            groups: self.groups.len(),
            shadow: self.shadow.len(),
            last_fetch: self.fetched_at,
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Counts and freshness of the published snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of account records.
    pub accounts: usize,
    /// Number of group records.
    pub groups: usize,
    /// Number of shadow records.
    pub shadow: usize,
    /// Time of the last successful refresh.
    pub last_fetch: Option<DateTime<Utc>>,
}

impl CacheStats {
    /// Age of the snapshot at `now`. `None` before the first refresh.
    ///
    /// Clock skew that would make the age negative is clamped to zero.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_fetch
            .map(|fetched| (now - fetched).to_std().unwrap_or(Duration::ZERO))
    }

    /// Whether the snapshot is older than `max_age` (or was never fetched).
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now).map_or(true, |age| age > max_age)
    }
}
