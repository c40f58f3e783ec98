//! Directory client boundary.
//!
//! The cache only sees these two traits. A [`DirectoryClient`] opens one
//! [`DirectorySession`] per refresh cycle; the session is authenticated,
//! queried three times and closed. Sessions are never reused across cycles.

use std::fmt;

use async_trait::async_trait;

use crate::entry::DirectoryEntry;
use crate::error::DirectoryResult;

/// Bind identity and credential.
#[derive(Clone, PartialEq, Eq)]
pub struct BindCredentials {
    /// Bind DN. Empty means an anonymous bind.
    pub identity: String,
    /// Bind password.
    pub credential: String,
}

impl BindCredentials {
    /// Creates bind credentials.
    #[must_use]
    pub fn new(identity: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            credential: credential.into(),
        }
    }
}

impl fmt::Debug for BindCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindCredentials")
            .field("identity", &self.identity)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Factory for directory sessions.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Establishes a new transport connection.
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectorySession>>;

    /// Credentials the cache authenticates with after connecting.
    fn credentials(&self) -> &BindCredentials;

    /// Human-readable endpoint for logs (never includes credentials).
    fn endpoint(&self) -> String;
}

/// One open connection to the directory.
#[async_trait]
pub trait DirectorySession: Send {
    /// Authenticates the session.
    async fn authenticate(&mut self, credentials: &BindCredentials) -> DirectoryResult<()>;

    /// Runs the account query.
    async fn fetch_account_entries(&mut self) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Runs the group query.
    async fn fetch_group_entries(&mut self) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Runs the shadow query.
    async fn fetch_shadow_entries(&mut self) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Closes the transport. Further calls fail with `NotConnected`.
    async fn close(&mut self) -> DirectoryResult<()>;
}
