//! Directory error types.
//!
//! ## Security Note
//!
//! Error messages must not leak bind credentials.

use thiserror::Error;

/// Errors raised while talking to the directory server.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Invalid configuration.
    #[error("directory configuration error: {0}")]
    Configuration(String),

    /// Transport could not be established.
    #[error("directory connection failed: {0}")]
    Connection(String),

    /// Bind (authentication) failed.
    #[error("directory bind failed: {0}")]
    Bind(String),

    /// A search returned an error.
    #[error("{query} search failed: {message}")]
    Search {
        /// Which query failed (`account`, `group`, `shadow`).
        query: &'static str,
        /// Server or transport message.
        message: String,
    },

    /// An operation was attempted on a closed session.
    #[error("directory session is not connected")]
    NotConnected,

    /// Underlying ldap3 error.
    #[error("LDAP error: {0}")]
    Ldap3(#[from] ldap3::LdapError),
}

impl DirectoryError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a bind error.
    #[must_use]
    pub fn bind(msg: impl Into<String>) -> Self {
        Self::Bind(msg.into())
    }

    /// Creates a search error for the named query.
    #[must_use]
    pub fn search(query: &'static str, msg: impl Into<String>) -> Self {
        Self::Search {
            query,
            message: msg.into(),
        }
    }

    /// Checks if this is a transport-level error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::NotConnected)
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
