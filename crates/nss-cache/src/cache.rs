//! The snapshot cache and its refresh loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nss_directory::{DirectoryClient, DirectorySession, RecordMapper};
use nss_model::{AccountRecord, GroupRecord, ShadowRecord};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{CacheError, CacheResult};
use crate::snapshot::{CacheStats, Snapshot};

// ============================================================================
// Settings
// ============================================================================

/// Refresh policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Interval between background refreshes.
    pub ttl: Duration,
    /// Deadline for a whole refresh cycle. `None` waits indefinitely.
    pub refresh_timeout: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            refresh_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl CacheSettings {
    /// Creates settings with the given refresh interval.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    /// Sets the per-cycle deadline.
    #[must_use]
    pub const fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Holds the published [`Snapshot`] and keeps it fresh.
///
/// Reads clone an `Arc` under a short read lock and never wait on the
/// directory. A refresh builds the next snapshot off to the side and swaps
/// it in with a single write.
pub struct SnapshotCache {
    client: Arc<dyn DirectoryClient>,
    mapper: RecordMapper,
    settings: CacheSettings,
    current: RwLock<Arc<Snapshot>>,
    refresh_guard: tokio::sync::Mutex<()>,
    started: AtomicBool,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("endpoint", &self.client.endpoint())
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl SnapshotCache {
    /// Creates a cache holding the empty snapshot.
    #[must_use]
    pub fn new(
        client: Arc<dyn DirectoryClient>,
        mapper: RecordMapper,
        settings: CacheSettings,
    ) -> Self {
        Self {
            client,
            mapper,
            settings,
            current: RwLock::new(Arc::new(Snapshot::empty())),
            refresh_guard: tokio::sync::Mutex::new(()),
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Returns the refresh policy.
    #[must_use]
    pub const fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Runs the initial refresh and spawns the background loop.
    ///
    /// The initial refresh error is returned as-is; the loop is only
    /// spawned once data has been published.
    pub async fn start(self: &Arc<Self>) -> CacheResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(CacheError::Stopped);
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CacheError::AlreadyStarted);
        }

        if let Err(e) = self.refresh().await {
            self.started.store(false, Ordering::Release);
            return Err(e);
        }

        let handle = self.spawn_refresh_loop();
        *self.task.lock() = Some(handle);

        tracing::info!(
            endpoint = %self.client.endpoint(),
            ttl_secs = self.settings.ttl.as_secs(),
            "Snapshot cache started"
        );
        Ok(())
    }

    /// Signals the background loop to exit.
    ///
    /// Does not wait and does not interrupt a refresh that is already
    /// running. Calling it again has no effect.
    pub fn stop(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        tracing::info!("Snapshot cache stopping");
    }

    /// Stops the loop and waits for it to finish, including any refresh in
    /// progress.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Refresh loop ended abnormally");
            }
        }
    }

    /// Returns `true` once the background loop has been asked to exit.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn spawn_refresh_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let token = self.shutdown.clone();
        let ttl = self.settings.ttl;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + ttl, ttl);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = cache.refresh().await {
                            let stats = cache.stats();
                            tracing::warn!(
                                error = %e,
                                last_fetch = ?stats.last_fetch,
                                "Directory refresh failed; keeping previous snapshot"
                            );
                        }
                    }
                }
            }

            tracing::debug!("Refresh loop exited");
        })
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    /// Runs one refresh cycle and publishes the result.
    ///
    /// On error nothing is published. Concurrent calls run one at a time.
    pub async fn refresh(&self) -> CacheResult<()> {
        let _guard = self.refresh_guard.lock().await;
        let started = Instant::now();

        let snapshot = match self.settings.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch())
                .await
                .map_err(|_| CacheError::Timeout(limit))??,
            None => self.fetch().await?,
        };

        let stats = snapshot.stats();
        *self.current.write() = Arc::new(snapshot);

        tracing::info!(
            accounts = stats.accounts,
            groups = stats.groups,
            shadow = stats.shadow,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Directory snapshot refreshed"
        );
        Ok(())
    }

    async fn fetch(&self) -> CacheResult<Snapshot> {
        let mut session = self.client.connect().await?;
        let result = self.fetch_with(session.as_mut()).await;

        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "Failed to close directory session");
        }
        result
    }

    async fn fetch_with(&self, session: &mut dyn DirectorySession) -> CacheResult<Snapshot> {
        session.authenticate(self.client.credentials()).await?;

        let account_entries = session.fetch_account_entries().await?;
        if account_entries.is_empty() {
            return Err(CacheError::EmptyResult("account"));
        }
        let group_entries = session.fetch_group_entries().await?;
        let shadow_entries = session.fetch_shadow_entries().await?;

        let accounts = self.mapper.map_accounts(&account_entries);
        let groups = self.mapper.map_groups(&group_entries);
        let shadow = self.mapper.map_shadow(&shadow_entries);

        let dropped = (account_entries.len() - accounts.len())
            + (group_entries.len() - groups.len())
            + (shadow_entries.len() - shadow.len());
        if dropped > 0 {
            tracing::debug!(dropped, "Skipped entries that do not map to a record");
        }

        Ok(Snapshot::new(accounts, groups, shadow))
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Returns the published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Returns the published account records.
    #[must_use]
    pub fn accounts(&self) -> Arc<[AccountRecord]> {
        Arc::clone(&self.current.read().accounts)
    }

    /// Returns the published group records.
    #[must_use]
    pub fn groups(&self) -> Arc<[GroupRecord]> {
        Arc::clone(&self.current.read().groups)
    }

    /// Returns the published shadow records.
    #[must_use]
    pub fn shadow_records(&self) -> Arc<[ShadowRecord]> {
        Arc::clone(&self.current.read().shadow)
    }

    /// Time of the last successful refresh.
    #[must_use]
    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.current.read().fetched_at
    }

    /// Counts and fetch time of the published snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.current.read().stats()
    }
}

impl Drop for SnapshotCache {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
