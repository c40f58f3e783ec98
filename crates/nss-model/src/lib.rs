//! # nss-model
//!
//! POSIX account records served by the NSS gateway.
//!
//! Three record kinds mirror the classic flat files:
//!
//! - [`AccountRecord`] - one `passwd` line (RFC 2307 `posixAccount`)
//! - [`GroupRecord`] - one `group` line (RFC 2307 `posixGroup`)
//! - [`ShadowRecord`] - one `shadow` line (RFC 2307 `shadowAccount`)
//!
//! Every record renders to its flat line and parses back from it, so NSS
//! consumers and tests share a single definition of the format.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod error;
pub mod group;
pub mod shadow;

mod line;

pub use account::AccountRecord;
pub use error::{ParseRecordError, ParseResult};
pub use group::GroupRecord;
pub use shadow::ShadowRecord;

/// Password placeholder used in `passwd` and `group` lines.
///
/// Real hashes are only ever served through the shadow endpoint.
pub const PASSWORD_PLACEHOLDER: &str = "x";
