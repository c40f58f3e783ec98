//! `ldap3`-backed directory client.
//!
//! Every call to [`DirectoryClient::connect`] dials a fresh connection.
//! There is no pool: a half-broken transport from one refresh cycle must
//! never leak into the next.

use std::sync::Arc;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};

use crate::client::{BindCredentials, DirectoryClient, DirectorySession};
use crate::config::DirectoryConfig;
use crate::entry::DirectoryEntry;
use crate::error::{DirectoryError, DirectoryResult};

/// Directory client speaking LDAP through `ldap3`.
#[derive(Debug, Clone)]
pub struct LdapDirectoryClient {
    config: Arc<DirectoryConfig>,
    credentials: BindCredentials,
}

impl LdapDirectoryClient {
    /// Creates a client after validating the configuration.
    pub fn new(config: DirectoryConfig) -> DirectoryResult<Self> {
        config.validate()?;

        if !config.use_tls {
            tracing::warn!(
                host = %config.host,
                "LDAP transport is not encrypted; bind credentials travel in cleartext"
            );
        } else if config.skip_verify {
            tracing::warn!(host = %config.host, "LDAP certificate verification is disabled");
        }

        let credentials = config.credentials();
        Ok(Self {
            config: Arc::new(config),
            credentials,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn settings(&self) -> LdapConnSettings {
        LdapConnSettings::new()
            .set_conn_timeout(self.config.connect_timeout)
            .set_no_tls_verify(self.config.skip_verify)
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectoryClient {
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectorySession>> {
        let url = self.config.connection_url();

        let (conn, ldap) = LdapConnAsync::with_settings(self.settings(), &url)
            .await
            .map_err(|e| DirectoryError::connection(format!("{url}: {e}")))?;

        // Spawn connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!("LDAP connection driver error: {}", e);
            }
        });

        tracing::debug!(%url, "LDAP connection established");

        Ok(Box::new(LdapSession {
            ldap: Some(ldap),
            config: Arc::clone(&self.config),
        }))
    }

    fn credentials(&self) -> &BindCredentials {
        &self.credentials
    }

    fn endpoint(&self) -> String {
        self.config.connection_url()
    }
}

/// An open LDAP connection.
pub struct LdapSession {
    ldap: Option<Ldap>,
    config: Arc<DirectoryConfig>,
}

impl LdapSession {
    fn ldap_mut(&mut self) -> DirectoryResult<&mut Ldap> {
        self.ldap.as_mut().ok_or(DirectoryError::NotConnected)
    }

    async fn search(
        &mut self,
        query: &'static str,
        filter: &str,
        attrs: Vec<String>,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let base_dn = self.config.base_dn.clone();
        let ldap = self.ldap_mut()?;

        let (rs, _result) = ldap
            .search(&base_dn, Scope::Subtree, filter, attrs)
            .await
            .map_err(|e| DirectoryError::search(query, e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::search(query, e.to_string()))?;

        let entries: Vec<DirectoryEntry> = rs
            .into_iter()
            .map(SearchEntry::construct)
            .map(DirectoryEntry::from)
            .collect();

        tracing::debug!(query, count = entries.len(), "LDAP search complete");
        Ok(entries)
    }
}

fn owned(attrs: Vec<&str>) -> Vec<String> {
    attrs.into_iter().map(String::from).collect()
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn authenticate(&mut self, credentials: &BindCredentials) -> DirectoryResult<()> {
        let ldap = self.ldap_mut()?;
        ldap.simple_bind(&credentials.identity, &credentials.credential)
            .await
            .map_err(|e| DirectoryError::bind(e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::bind(e.to_string()))?;
        Ok(())
    }

    async fn fetch_account_entries(&mut self) -> DirectoryResult<Vec<DirectoryEntry>> {
        let filter = self.config.user_filter.clone();
        let attrs = owned(self.config.attributes.account_attributes());
        self.search("account", &filter, attrs).await
    }

    async fn fetch_group_entries(&mut self) -> DirectoryResult<Vec<DirectoryEntry>> {
        let filter = self.config.group_filter.clone();
        let attrs = owned(self.config.attributes.group_attributes());
        self.search("group", &filter, attrs).await
    }

    async fn fetch_shadow_entries(&mut self) -> DirectoryResult<Vec<DirectoryEntry>> {
        let filter = self.config.shadow_filter.clone();
        let attrs = owned(self.config.attributes.shadow_attributes());
        self.search("shadow", &filter, attrs).await
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        match self.ldap.take() {
            Some(mut ldap) => ldap.unbind().await.map_err(DirectoryError::from),
            None => Ok(()),
        }
    }
}
