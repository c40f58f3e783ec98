//! Account (passwd) record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseRecordError, ParseResult};
use crate::line::{check_field, parse_id, split_fields};
use crate::PASSWORD_PLACEHOLDER;

/// One `passwd` entry.
///
/// `uid` and `gid` are always non-zero: the mapper drops directory entries
/// that would produce a zero id instead of serving them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Login name (`uid`).
    pub name: String,
    /// Password field, always the placeholder.
    pub passwd: String,
    /// Numeric user id (`uidNumber`).
    pub uid: u32,
    /// Primary group id (`gidNumber`).
    pub gid: u32,
    /// Comment field (`gecos`, falling back to `cn`).
    pub gecos: String,
    /// Home directory (`homeDirectory`).
    pub dir: String,
    /// Login shell (`loginShell`).
    pub shell: String,
}

impl AccountRecord {
    /// Creates an account with the password placeholder and empty
    /// comment, home and shell.
    #[must_use]
    pub fn new(name: impl Into<String>, uid: u32, gid: u32) -> Self {
        Self {
            name: name.into(),
            passwd: PASSWORD_PLACEHOLDER.to_string(),
            uid,
            gid,
            gecos: String::new(),
            dir: String::new(),
            shell: String::new(),
        }
    }

    /// Sets the comment field.
    #[must_use]
    pub fn with_gecos(mut self, gecos: impl Into<String>) -> Self {
        self.gecos = gecos.into();
        self
    }

    /// Sets the home directory.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Sets the login shell.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Checks that no text field contains `:`, `\n` or `\r`.
    pub fn validate(&self) -> ParseResult<()> {
        check_field("name", &self.name)?;
        check_field("passwd", &self.passwd)?;
        check_field("gecos", &self.gecos)?;
        check_field("dir", &self.dir)?;
        check_field("shell", &self.shell)
    }

    /// Formats the record as a `passwd` line (without newline).
    pub fn to_passwd_line(&self) -> ParseResult<String> {
        self.validate()?;
        Ok(self.to_string())
    }
}

/// Fails with [`fmt::Error`] when [`AccountRecord::validate`] fails.
impl fmt::Display for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.validate().map_err(|_| fmt::Error)?;
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}",
            self.name, self.passwd, self.uid, self.gid, self.gecos, self.dir, self.shell
        )
    }
}

impl FromStr for AccountRecord {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> ParseResult<Self> {
        let [name, passwd, uid, gid, gecos, dir, shell] = split_fields::<7>(line)?;
        Ok(Self {
            name: name.to_string(),
            passwd: passwd.to_string(),
            uid: parse_id("uid", uid)?,
            gid: parse_id("gid", gid)?,
            gecos: gecos.to_string(),
            dir: dir.to_string(),
            shell: shell.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountRecord {
        AccountRecord::new("alice", 1000, 1000)
            .with_gecos("Alice Liddell")
            .with_dir("/home/alice")
            .with_shell("/bin/bash")
    }

    #[test]
    fn passwd_line_format() {
        assert_eq!(
            alice().to_passwd_line().unwrap(),
            "alice:x:1000:1000:Alice Liddell:/home/alice:/bin/bash"
        );
    }

    #[test]
    fn parses_passwd_line() {
        let parsed: AccountRecord = "alice:x:1000:1000:Alice Liddell:/home/alice:/bin/bash\n"
            .parse()
            .unwrap();
        assert_eq!(parsed, alice());
    }

    #[test]
    fn empty_fields_survive() {
        let record = AccountRecord::new("svc", 500, 500);
        let line = record.to_passwd_line().unwrap();
        assert_eq!(line, "svc:x:500:500:::");
        assert_eq!(line.parse::<AccountRecord>().unwrap(), record);
    }

    #[test]
    fn refuses_to_render_delimiters() {
        let record = alice().with_gecos("x:/home/m:/bin/sh\nevil::0:0:");
        assert!(matches!(
            record.to_passwd_line(),
            Err(ParseRecordError::UnsafeField { field: "gecos", .. })
        ));

        let mut out = String::new();
        assert!(fmt::write(&mut out, format_args!("{record}")).is_err());
        assert!(!out.contains('\n'));

        assert!(alice().with_dir("/home/a\r").validate().is_err());
        assert!(alice().with_shell("/bin/sh:").validate().is_err());
        assert!(AccountRecord::new("ev\nil", 1, 1).validate().is_err());
    }

    #[test]
    fn rejects_zero_uid() {
        let err = "root:x:0:0:root:/root:/bin/sh"
            .parse::<AccountRecord>()
            .unwrap_err();
        assert_eq!(err, ParseRecordError::ZeroId("uid"));
    }

    #[test]
    fn json_field_names() {
        let json = serde_json::to_value(alice()).unwrap();
        assert_eq!(json["name"], "alice");
        assert_eq!(json["passwd"], "x");
        assert_eq!(json["uid"], 1000);
        assert_eq!(json["gid"], 1000);
        assert_eq!(json["gecos"], "Alice Liddell");
        assert_eq!(json["dir"], "/home/alice");
        assert_eq!(json["shell"], "/bin/bash");
    }
}
