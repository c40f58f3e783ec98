//! Cache error types.

use std::time::Duration;

use nss_directory::DirectoryError;
use thiserror::Error;

/// Errors that abort a refresh cycle or a lifecycle call.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Connect, bind or search failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A query that must return entries returned none.
    #[error("{0} query returned no entries")]
    EmptyResult(&'static str),

    /// The refresh cycle exceeded its deadline.
    #[error("refresh did not complete within {0:?}")]
    Timeout(Duration),

    /// `start` was called on a running cache.
    #[error("cache already started")]
    AlreadyStarted,

    /// `start` was called after `stop`.
    #[error("cache has been stopped")]
    Stopped,
}

impl CacheError {
    /// Checks if the directory was unreachable.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        match self {
            Self::Directory(err) => err.is_connection_error(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
