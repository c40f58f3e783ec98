//! Scriptable in-memory directory for tests.
//!
//! [`InMemoryDirectory`] serves entries held in memory and lets a test:
//!
//! - fail any step of a refresh cycle ([`InMemoryDirectory::fail`]),
//! - pause a step until released ([`InMemoryDirectory::gate`]),
//! - count how many sessions were opened and closed.
//!
//! Clones share state, so a test keeps one handle while the cache owns
//! another.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::client::{BindCredentials, DirectoryClient, DirectorySession};
use crate::entry::DirectoryEntry;
use crate::error::{DirectoryError, DirectoryResult};

/// A step of a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Opening the transport.
    Connect,
    /// Binding.
    Authenticate,
    /// Account query.
    FetchAccounts,
    /// Group query.
    FetchGroups,
    /// Shadow query.
    FetchShadow,
}

impl Operation {
    fn error(self, message: &str) -> DirectoryError {
        match self {
            Self::Connect => DirectoryError::connection(message),
            Self::Authenticate => DirectoryError::bind(message),
            Self::FetchAccounts => DirectoryError::search("account", message),
            Self::FetchGroups => DirectoryError::search("group", message),
            Self::FetchShadow => DirectoryError::search("shadow", message),
        }
    }
}

/// Pauses an operation until released.
///
/// The operation signals [`Gate::entered`] when it reaches the gate and
/// then waits for [`Gate::release`].
#[derive(Debug, Clone, Default)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    /// Waits until an operation is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Lets the parked operation continue.
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Debug, Default)]
struct State {
    accounts: Vec<DirectoryEntry>,
    groups: Vec<DirectoryEntry>,
    shadow: Vec<DirectoryEntry>,
    failures: HashMap<Operation, String>,
    gates: HashMap<Operation, Gate>,
    connects: usize,
    closes: usize,
    credentials_seen: Vec<BindCredentials>,
}

/// In-memory [`DirectoryClient`].
#[derive(Debug, Clone)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<State>>,
    credentials: BindCredentials,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            credentials: BindCredentials::new("cn=reader,dc=example,dc=com", "reader"),
        }
    }

    /// Replaces the account entries.
    pub fn set_accounts(&self, entries: Vec<DirectoryEntry>) {
        self.state.lock().accounts = entries;
    }

    /// Replaces the group entries.
    pub fn set_groups(&self, entries: Vec<DirectoryEntry>) {
        self.state.lock().groups = entries;
    }

    /// Replaces the shadow entries.
    pub fn set_shadow(&self, entries: Vec<DirectoryEntry>) {
        self.state.lock().shadow = entries;
    }

    /// Makes `operation` fail until [`InMemoryDirectory::clear_failures`].
    pub fn fail(&self, operation: Operation, message: impl Into<String>) {
        self.state.lock().failures.insert(operation, message.into());
    }

    /// Removes every injected failure.
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Parks the next call of `operation` until the returned gate is
    /// released. The gate is consumed by that call.
    #[must_use]
    pub fn gate(&self, operation: Operation) -> Gate {
        let gate = Gate::default();
        self.state.lock().gates.insert(operation, gate.clone());
        gate
    }

    /// Number of sessions opened.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Number of sessions closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    /// Credentials presented to `authenticate`, in order.
    #[must_use]
    pub fn credentials_seen(&self) -> Vec<BindCredentials> {
        self.state.lock().credentials_seen.clone()
    }
}

/// Runs the gate and failure checks for one operation.
async fn step(state: &Mutex<State>, operation: Operation) -> DirectoryResult<()> {
    let gate = state.lock().gates.remove(&operation);
    if let Some(gate) = gate {
        gate.pass().await;
    }
    match state.lock().failures.get(&operation) {
        Some(message) => Err(operation.error(message)),
        None => Ok(()),
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectorySession>> {
        step(&self.state, Operation::Connect).await?;
        self.state.lock().connects += 1;
        Ok(Box::new(InMemorySession {
            state: Arc::clone(&self.state),
            open: true,
        }))
    }

    fn credentials(&self) -> &BindCredentials {
        &self.credentials
    }

    fn endpoint(&self) -> String {
        "memory://".to_string()
    }
}

struct InMemorySession {
    state: Arc<Mutex<State>>,
    open: bool,
}

impl InMemorySession {
    async fn fetch(&self, operation: Operation) -> DirectoryResult<Vec<DirectoryEntry>> {
        if !self.open {
            return Err(DirectoryError::NotConnected);
        }
        step(&self.state, operation).await?;
        let state = self.state.lock();
        Ok(match operation {
            Operation::FetchAccounts => state.accounts.clone(),
            Operation::FetchGroups => state.groups.clone(),
            _ => state.shadow.clone(),
        })
    }
}

#[async_trait]
impl DirectorySession for InMemorySession {
    async fn authenticate(&mut self, credentials: &BindCredentials) -> DirectoryResult<()> {
        if !self.open {
            return Err(DirectoryError::NotConnected);
        }
        self.state.lock().credentials_seen.push(credentials.clone());
        step(&self.state, Operation::Authenticate).await
    }

    async fn fetch_account_entries(&mut self) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.fetch(Operation::FetchAccounts).await
    }

    async fn fetch_group_entries(&mut self) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.fetch(Operation::FetchGroups).await
    }

    async fn fetch_shadow_entries(&mut self) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.fetch(Operation::FetchShadow).await
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        if std::mem::replace(&mut self.open, false) {
            self.state.lock().closes += 1;
        }
        Ok(())
    }
}
