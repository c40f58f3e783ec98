//! # nss-cache
//!
//! Refresh-and-serve cache of directory account data.
//!
//! [`SnapshotCache`] periodically pulls accounts, groups and shadow entries
//! from a [`DirectoryClient`](nss_directory::DirectoryClient), maps them to
//! POSIX records and publishes them as one immutable [`Snapshot`].
//!
//! ## Guarantees
//!
//! - Readers never block on a refresh and always see a complete snapshot.
//! - A failed refresh leaves the previous snapshot in place.
//! - At most one refresh runs at a time.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nss_cache::{CacheSettings, SnapshotCache};
//!
//! let cache = Arc::new(SnapshotCache::new(client, mapper, CacheSettings::default()));
//! cache.start().await?;
//! for account in cache.accounts().iter() {
//!     println!("{account}");
//! }
//! cache.stop();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod snapshot;

pub use cache::{CacheSettings, SnapshotCache};
pub use error::{CacheError, CacheResult};
pub use snapshot::{CacheStats, Snapshot};
