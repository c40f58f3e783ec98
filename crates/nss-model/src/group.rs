//! Group record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseRecordError, ParseResult};
use crate::line::{check_field, is_safe_member, parse_id, split_fields};
use crate::PASSWORD_PLACEHOLDER;

/// One `group` entry.
///
/// Members are kept in directory order. Names from `memberUid` come first,
/// followed by names extracted from `member` DNs; duplicates are preserved
/// and members are not checked against known accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Group name (`cn`).
    pub name: String,
    /// Password field, always the placeholder.
    pub passwd: String,
    /// Numeric group id (`gidNumber`).
    pub gid: u32,
    /// Member login names.
    pub members: Vec<String>,
}

impl GroupRecord {
    /// Creates a group with no members.
    #[must_use]
    pub fn new(name: impl Into<String>, gid: u32) -> Self {
        Self {
            name: name.into(),
            passwd: PASSWORD_PLACEHOLDER.to_string(),
            gid,
            members: Vec::new(),
        }
    }

    /// Sets the member list.
    #[must_use]
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = members.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `name` can appear in the member list.
    #[must_use]
    pub fn is_valid_member(name: &str) -> bool {
        is_safe_member(name)
    }

    /// Checks that no field contains `:`, `\n` or `\r`, and no member
    /// contains `,`.
    pub fn validate(&self) -> ParseResult<()> {
        check_field("name", &self.name)?;
        check_field("passwd", &self.passwd)?;
        match self.members.iter().find(|m| !is_safe_member(m)) {
            Some(member) => Err(ParseRecordError::UnsafeField {
                field: "members",
                value: member.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Formats the record as a `group` line (without newline).
    pub fn to_group_line(&self) -> ParseResult<String> {
        self.validate()?;
        Ok(self.to_string())
    }
}

/// Fails with [`fmt::Error`] when [`GroupRecord::validate`] fails.
impl fmt::Display for GroupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.validate().map_err(|_| fmt::Error)?;
        write!(
            f,
            "{}:{}:{}:{}",
            self.name,
            self.passwd,
            self.gid,
            self.members.join(",")
        )
    }
}

impl FromStr for GroupRecord {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> ParseResult<Self> {
        let [name, passwd, gid, members] = split_fields::<4>(line)?;
        let members = if members.is_empty() {
            Vec::new()
        } else {
            members.split(',').map(String::from).collect()
        };
        Ok(Self {
            name: name.to_string(),
            passwd: passwd.to_string(),
            gid: parse_id("gid", gid)?,
            members,
        })
    }
}
