//! Gateway configuration.
//!
//! Configuration is read from a YAML file and then patched from the
//! environment:
//!
//! | Variable | Overrides |
//! |---|---|
//! | `LDAP_BIND_PASSWORD` | `ldap.bind_password` |
//! | `NSS_GATEWAY_LISTEN` | `server.listen` |

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use nss_cache::CacheSettings;
use nss_directory::DirectoryConfig;
use serde::Deserialize;

/// Environment variable holding the bind credential.
pub const BIND_PASSWORD_ENV: &str = "LDAP_BIND_PASSWORD";

/// Environment variable holding the listen address.
pub const LISTEN_ENV: &str = "NSS_GATEWAY_LISTEN";

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Directory connection and search settings.
    pub ldap: DirectoryConfig,
    /// Refresh policy.
    #[serde(default)]
    pub cache: CacheConfig,
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Refresh policy, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Interval between refreshes.
    #[serde(default = "default_ttl")]
    pub ttl: u64,
    /// Deadline for one refresh cycle. `0` disables it.
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout: u64,
    /// Age after which the snapshot is reported stale.
    #[serde(default)]
    pub stale_after: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            refresh_timeout: default_refresh_timeout(),
            stale_after: None,
        }
    }
}

fn default_ttl() -> u64 {
    300
}

fn default_refresh_timeout() -> u64 {
    60
}

impl CacheConfig {
    /// Converts to the cache's refresh settings.
    #[must_use]
    pub fn settings(&self) -> CacheSettings {
        let timeout =
            (self.refresh_timeout > 0).then(|| Duration::from_secs(self.refresh_timeout));
        CacheSettings::new(Duration::from_secs(self.ttl)).with_refresh_timeout(timeout)
    }

    /// Staleness threshold, if configured.
    #[must_use]
    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after.map(Duration::from_secs)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GatewayConfig {
    /// Reads, patches from the environment and validates a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(BIND_PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.ldap.bind_password = password;
        }
        if let Some(listen) = lookup(LISTEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.server.listen = listen;
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.ldap.validate()?;
        if self.cache.ttl == 0 {
            bail!("cache.ttl must be greater than zero");
        }
        if self.cache.stale_after == Some(0) {
            bail!("cache.stale_after must be greater than zero when set");
        }
        self.listen_addr()?;
        Ok(())
    }

    /// Parses the listen address.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .listen
            .parse()
            .with_context(|| format!("invalid server.listen address {:?}", self.server.listen))
    }
}
