//! Shadow record.
//!
//! Numeric fields follow `shadow(5)`: any negative value means the field is
//! unset and renders as an empty field in the flat line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseRecordError, ParseResult};
use crate::line::{check_field, split_fields};

/// One `shadow` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowRecord {
    /// Login name (`uid`).
    pub name: String,
    /// Password hash, or [`ShadowRecord::LOCKED`] when the directory has none.
    pub passwd: String,
    /// Days since epoch of the last password change (`shadowLastChange`).
    #[serde(rename = "lastchg")]
    pub last_change: i64,
    /// Minimum password age in days (`shadowMin`).
    #[serde(rename = "min")]
    pub min_age: i64,
    /// Maximum password age in days (`shadowMax`).
    #[serde(rename = "max")]
    pub max_age: i64,
    /// Warning period in days (`shadowWarning`).
    #[serde(rename = "warn")]
    pub warning: i64,
    /// Inactivity period in days (`shadowInactive`).
    pub inactive: i64,
    /// Account expiration, days since epoch (`shadowExpire`).
    pub expire: i64,
    /// Reserved flag (`shadowFlag`).
    pub flag: i64,
}

impl ShadowRecord {
    /// Sentinel for an unset numeric field.
    pub const UNSET: i64 = -1;

    /// Password field for accounts without a usable hash.
    pub const LOCKED: &'static str = "!!";

    /// Default `shadowLastChange`.
    pub const DEFAULT_LAST_CHANGE: i64 = 0;
    /// Default `shadowMin`.
    pub const DEFAULT_MIN_AGE: i64 = 0;
    /// Default `shadowMax`.
    pub const DEFAULT_MAX_AGE: i64 = 99999;
    /// Default `shadowWarning`.
    pub const DEFAULT_WARNING: i64 = 7;

    /// Creates a locked record with every numeric field at its default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passwd: Self::LOCKED.to_string(),
            last_change: Self::DEFAULT_LAST_CHANGE,
            min_age: Self::DEFAULT_MIN_AGE,
            max_age: Self::DEFAULT_MAX_AGE,
            warning: Self::DEFAULT_WARNING,
            inactive: Self::UNSET,
            expire: Self::UNSET,
            flag: Self::UNSET,
        }
    }

    /// Sets the password hash.
    #[must_use]
    pub fn with_passwd(mut self, passwd: impl Into<String>) -> Self {
        self.passwd = passwd.into();
        self
    }

    /// Sets the last-change day.
    #[must_use]
    pub const fn with_last_change(mut self, day: i64) -> Self {
        self.last_change = day;
        self
    }

    /// Returns true when the password field is the locked sentinel.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.passwd == Self::LOCKED
    }

    /// Checks that neither text field contains `:`, `\n` or `\r`.
    pub fn validate(&self) -> ParseResult<()> {
        check_field("name", &self.name)?;
        check_field("passwd", &self.passwd)
    }

    /// Formats the record as a `shadow` line (without newline).
    pub fn to_shadow_line(&self) -> ParseResult<String> {
        self.validate()?;
        Ok(self.to_string())
    }
}

/// Wrapper rendering unset values as an empty field.
struct Field(i64);

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            Ok(())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Fails with [`fmt::Error`] when [`ShadowRecord::validate`] fails.
impl fmt::Display for ShadowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.validate().map_err(|_| fmt::Error)?;
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}:{}:{}",
            self.name,
            self.passwd,
            Field(self.last_change),
            Field(self.min_age),
            Field(self.max_age),
            Field(self.warning),
            Field(self.inactive),
            Field(self.expire),
            Field(self.flag),
        )
    }
}

fn parse_field(field: &'static str, value: &str) -> ParseResult<i64> {
    if value.is_empty() {
        return Ok(ShadowRecord::UNSET);
    }
    value.parse().map_err(|_| ParseRecordError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

impl FromStr for ShadowRecord {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> ParseResult<Self> {
        let [name, passwd, lastchg, min, max, warn, inactive, expire, flag] =
            split_fields::<9>(line)?;
        Ok(Self {
            name: name.to_string(),
            passwd: passwd.to_string(),
            last_change: parse_field("lastchg", lastchg)?,
            min_age: parse_field("min", min)?,
            max_age: parse_field("max", max)?,
            warning: parse_field("warn", warn)?,
            inactive: parse_field("inactive", inactive)?,
            expire: parse_field("expire", expire)?,
            flag: parse_field("flag", flag)?,
        })
    }
}
