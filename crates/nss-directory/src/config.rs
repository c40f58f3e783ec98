//! Directory connection and search configuration.
//!
//! The `ldap:` section of the gateway YAML deserializes straight into
//! [`DirectoryConfig`]. Unset keys fall back to RFC 2307 defaults.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::BindCredentials;
use crate::error::{DirectoryError, DirectoryResult};

// ============================================================================
// Attribute Map
// ============================================================================

/// Names of the directory attributes read by the mapper.
///
/// Defaults follow RFC 2307 (`posixAccount`, `posixGroup`, `shadowAccount`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeMap {
    /// Login name, also the RDN key looked up in group `member` DNs.
    pub login: String,
    /// Numeric user id.
    pub uid_number: String,
    /// Numeric group id.
    pub gid_number: String,
    /// Preferred comment attribute.
    pub gecos: String,
    /// Fallback comment attribute, also the group name.
    pub common_name: String,
    /// Home directory.
    pub home_directory: String,
    /// Login shell.
    pub login_shell: String,
    /// Flat member list on groups.
    pub member_uid: String,
    /// Member DN list on groups.
    pub member: String,
    /// Password hash.
    pub user_password: String,
    /// Last password change day.
    pub shadow_last_change: String,
    /// Minimum password age.
    pub shadow_min: String,
    /// Maximum password age.
    pub shadow_max: String,
    /// Warning period.
    pub shadow_warning: String,
    /// Inactivity period.
    pub shadow_inactive: String,
    /// Expiration day.
    pub shadow_expire: String,
    /// Reserved flag.
    pub shadow_flag: String,
}

impl Default for AttributeMap {
    fn default() -> Self {
        Self {
            login: "uid".to_string(),
            uid_number: "uidNumber".to_string(),
            gid_number: "gidNumber".to_string(),
            gecos: "gecos".to_string(),
            common_name: "cn".to_string(),
            home_directory: "homeDirectory".to_string(),
            login_shell: "loginShell".to_string(),
            member_uid: "memberUid".to_string(),
            member: "member".to_string(),
            user_password: "userPassword".to_string(),
            shadow_last_change: "shadowLastChange".to_string(),
            shadow_min: "shadowMin".to_string(),
            shadow_max: "shadowMax".to_string(),
            shadow_warning: "shadowWarning".to_string(),
            shadow_inactive: "shadowInactive".to_string(),
            shadow_expire: "shadowExpire".to_string(),
            shadow_flag: "shadowFlag".to_string(),
        }
    }
}

impl AttributeMap {
    /// Attributes requested by the account search.
    #[must_use]
    pub fn account_attributes(&self) -> Vec<&str> {
        vec![
            self.login.as_str(),
            self.uid_number.as_str(),
            self.gid_number.as_str(),
            self.common_name.as_str(),
            self.gecos.as_str(),
            self.home_directory.as_str(),
            self.login_shell.as_str(),
        ]
    }

    /// Attributes requested by the group search.
    #[must_use]
    pub fn group_attributes(&self) -> Vec<&str> {
        vec![
            self.common_name.as_str(),
            self.gid_number.as_str(),
            self.member_uid.as_str(),
            self.member.as_str(),
        ]
    }

    /// Attributes requested by the shadow search.
    #[must_use]
    pub fn shadow_attributes(&self) -> Vec<&str> {
        vec![
            self.login.as_str(),
            self.user_password.as_str(),
            self.shadow_last_change.as_str(),
            self.shadow_min.as_str(),
            self.shadow_max.as_str(),
            self.shadow_warning.as_str(),
            self.shadow_inactive.as_str(),
            self.shadow_expire.as_str(),
            self.shadow_flag.as_str(),
        ]
    }
}

// ============================================================================
// Directory Configuration
// ============================================================================

/// Directory server configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    // === Connection ===
    /// Server host name.
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Use LDAPS (TLS from connection start).
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,

    /// Skip server certificate verification.
    #[serde(default)]
    pub skip_verify: bool,

    /// Connect timeout.
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,

    // === Bind ===
    /// Bind DN for the service account.
    #[serde(default)]
    pub bind_dn: String,

    /// Bind credential.
    #[serde(default, skip_serializing)]
    pub bind_password: String,

    // === Search ===
    /// Base DN for all three searches.
    pub base_dn: String,

    /// Account search filter.
    #[serde(default = "default_user_filter")]
    pub user_filter: String,

    /// Group search filter.
    #[serde(default = "default_group_filter")]
    pub group_filter: String,

    /// Shadow search filter.
    #[serde(default = "default_shadow_filter")]
    pub shadow_filter: String,

    /// Attribute names.
    #[serde(default)]
    pub attributes: AttributeMap,
}

fn default_port() -> u16 {
    636
}

fn default_use_tls() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_filter() -> String {
    "(objectClass=posixAccount)".to_string()
}

fn default_group_filter() -> String {
    "(objectClass=posixGroup)".to_string()
}

fn default_shadow_filter() -> String {
    "(objectClass=shadowAccount)".to_string()
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("skip_verify", &self.skip_verify)
            .field("connect_timeout", &self.connect_timeout)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("base_dn", &self.base_dn)
            .field("user_filter", &self.user_filter)
            .field("group_filter", &self.group_filter)
            .field("shadow_filter", &self.shadow_filter)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl DirectoryConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> DirectoryConfigBuilder {
        DirectoryConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.host.trim().is_empty() {
            return Err(DirectoryError::config("host cannot be empty"));
        }
        if self.port == 0 {
            return Err(DirectoryError::config("port cannot be zero"));
        }
        if self.base_dn.trim().is_empty() {
            return Err(DirectoryError::config("base_dn cannot be empty"));
        }
        for (name, filter) in [
            ("user_filter", &self.user_filter),
            ("group_filter", &self.group_filter),
            ("shadow_filter", &self.shadow_filter),
        ] {
            validate_filter(name, filter)?;
        }
        if self.attributes.login.is_empty() {
            return Err(DirectoryError::config("attributes.login cannot be empty"));
        }
        Ok(())
    }

    /// Returns the connection URL (`ldaps://` or `ldap://`).
    #[must_use]
    pub fn connection_url(&self) -> String {
        let scheme = if self.use_tls { "ldaps" } else { "ldap" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// Returns the bind identity and credential.
    #[must_use]
    pub fn credentials(&self) -> BindCredentials {
        BindCredentials::new(&self.bind_dn, &self.bind_password)
    }
}

/// Minimal structural check: a filter must be a parenthesized expression
/// with balanced parentheses.
fn validate_filter(name: &str, filter: &str) -> DirectoryResult<()> {
    let filter = filter.trim();
    if !filter.starts_with('(') || !filter.ends_with(')') {
        return Err(DirectoryError::config(format!(
            "{name} must be a parenthesized LDAP filter"
        )));
    }

    let mut depth: i32 = 0;
    let mut escaped = false;
    for c in filter.chars() {
        match c {
            '\\' if !escaped => {
                escaped = true;
                continue;
            }
            '(' if !escaped => depth += 1,
            ')' if !escaped => {
                depth -= 1;
                if depth < 0 {
                    break;
                }
            }
            _ => {}
        }
        escaped = false;
    }
    if depth != 0 {
        return Err(DirectoryError::config(format!(
            "{name} has unbalanced parentheses"
        )));
    }
    Ok(())
}

/// Serde support for `Duration` as whole seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// ============================================================================
// Configuration Builder
// ============================================================================

/// Builder for [`DirectoryConfig`].
#[derive(Debug, Default)]
pub struct DirectoryConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    use_tls: Option<bool>,
    skip_verify: bool,
    connect_timeout: Option<Duration>,
    bind_dn: String,
    bind_password: String,
    base_dn: Option<String>,
    user_filter: Option<String>,
    group_filter: Option<String>,
    shadow_filter: Option<String>,
    attributes: AttributeMap,
}

impl DirectoryConfigBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the server port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Enables or disables LDAPS.
    #[must_use]
    pub const fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = Some(use_tls);
        self
    }

    /// Skips certificate verification.
    #[must_use]
    pub const fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the bind DN and password.
    #[must_use]
    pub fn bind(mut self, dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.bind_dn = dn.into();
        self.bind_password = password.into();
        self
    }

    /// Sets the base DN.
    #[must_use]
    pub fn base_dn(mut self, dn: impl Into<String>) -> Self {
        self.base_dn = Some(dn.into());
        self
    }

    /// Sets the account filter.
    #[must_use]
    pub fn user_filter(mut self, filter: impl Into<String>) -> Self {
        self.user_filter = Some(filter.into());
        self
    }

    /// Sets the group filter.
    #[must_use]
    pub fn group_filter(mut self, filter: impl Into<String>) -> Self {
        self.group_filter = Some(filter.into());
        self
    }

    /// Sets the shadow filter.
    #[must_use]
    pub fn shadow_filter(mut self, filter: impl Into<String>) -> Self {
        self.shadow_filter = Some(filter.into());
        self
    }

    /// Sets the attribute map.
    #[must_use]
    pub fn attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> DirectoryResult<DirectoryConfig> {
        let config = DirectoryConfig {
            host: self
                .host
                .ok_or_else(|| DirectoryError::config("host is required"))?,
            port: self.port.unwrap_or_else(default_port),
            use_tls: self.use_tls.unwrap_or_else(default_use_tls),
            skip_verify: self.skip_verify,
            connect_timeout: self.connect_timeout.unwrap_or_else(default_connect_timeout),
            bind_dn: self.bind_dn,
            bind_password: self.bind_password,
            base_dn: self
                .base_dn
                .ok_or_else(|| DirectoryError::config("base_dn is required"))?,
            user_filter: self.user_filter.unwrap_or_else(default_user_filter),
            group_filter: self.group_filter.unwrap_or_else(default_group_filter),
            shadow_filter: self.shadow_filter.unwrap_or_else(default_shadow_filter),
            attributes: self.attributes,
        };

        config.validate()?;

        Ok(config)
    }
}
