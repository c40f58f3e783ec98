//! # nss-directory
//!
//! Directory access for the NSS gateway.
//!
//! - [`DirectoryClient`] / [`DirectorySession`] - the boundary the cache
//!   depends on: connect, authenticate, three queries, close
//! - [`LdapDirectoryClient`] - the production client, built on `ldap3`
//! - [`RecordMapper`] - pure mapping from [`DirectoryEntry`] to the
//!   records in `nss-model`
//!
//! Enable the `test-util` feature for [`memory::InMemoryDirectory`], a
//! scriptable directory used by the cache and server tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod dn;
pub mod entry;
pub mod error;
pub mod ldap;
pub mod mapper;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use client::{BindCredentials, DirectoryClient, DirectorySession};
pub use config::{AttributeMap, DirectoryConfig, DirectoryConfigBuilder};
pub use entry::DirectoryEntry;
pub use error::{DirectoryError, DirectoryResult};
pub use ldap::LdapDirectoryClient;
pub use mapper::RecordMapper;
