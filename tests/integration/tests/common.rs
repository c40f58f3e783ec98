//! Common test utilities and fixtures.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use nss_cache::SnapshotCache;
use nss_directory::memory::InMemoryDirectory;
use nss_directory::{DirectoryEntry, RecordMapper};
use nss_server::{GatewayConfig, Server};

/// Minimal configuration; the LDAP section is only used for validation.
pub const CONFIG: &str = r#"
ldap:
  host: ldap.example.com
  base_dn: dc=example,dc=com
cache:
  ttl: 300
server:
  listen: 127.0.0.1:0
"#;

/// A running gateway backed by an in-memory directory.
pub struct TestEnv {
    /// The directory behind the cache.
    pub directory: InMemoryDirectory,
    /// The cache served by the gateway.
    pub cache: Arc<SnapshotCache>,
    /// Base URL of the running server.
    pub base_url: String,
    /// HTTP client for testing.
    pub client: Client,
    /// Server shutdown signal.
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<anyhow::Result<()>>>,
}

impl TestEnv {
    /// Starts a gateway over the standard fixture directory.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_directory(fixture_directory(), CONFIG).await
    }

    /// Starts a gateway over `directory` using the YAML `config`.
    pub async fn with_directory(directory: InMemoryDirectory, config: &str) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("nss_server=debug,nss_cache=debug,tower_http=info")
            .with_test_writer()
            .try_init();

        let config = GatewayConfig::from_yaml(config)?;
        config.validate()?;

        let cache = Arc::new(SnapshotCache::new(
            Arc::new(directory.clone()),
            RecordMapper::new(config.ldap.attributes.clone()),
            config.cache.settings(),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = Server::with_cache(config, Arc::clone(&cache));
        let handle = tokio::spawn(server.serve(listener, async {
            let _ = shutdown_rx.await;
        }));

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        wait_for_server(&client, &base_url).await?;

        Ok(Self {
            directory,
            cache,
            base_url,
            client,
            shutdown_tx: Some(shutdown_tx),
            server: Some(handle),
        })
    }

    /// Sends a GET request to `path`.
    pub async fn get(&self, path: &str) -> anyhow::Result<Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?)
    }

    /// Sends a GET request and returns the body text.
    pub async fn get_text(&self, path: &str) -> anyhow::Result<String> {
        let response = self.get(path).await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Sends a GET request and returns the parsed JSON body.
    pub async fn get_json(&self, path: &str) -> anyhow::Result<serde_json::Value> {
        let response = self.get(path).await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Stops the server and waits for it to exit.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.server.take() {
            Some(handle) => handle.await?,
            None => Ok(()),
        }
    }
}

/// An account entry with the usual RFC 2307 attributes.
pub fn account(login: &str, uid: &str, gid: &str) -> DirectoryEntry {
    DirectoryEntry::new(format!("uid={login},ou=people,dc=example,dc=com"))
        .with_attr("uid", login)
        .with_attr("uidNumber", uid)
        .with_attr("gidNumber", gid)
        .with_attr("gecos", format!("{login} user"))
        .with_attr("homeDirectory", format!("/home/{login}"))
        .with_attr("loginShell", "/bin/bash")
}

/// A group entry.
pub fn group(name: &str, gid: &str) -> DirectoryEntry {
    DirectoryEntry::new(format!("cn={name},ou=groups,dc=example,dc=com"))
        .with_attr("cn", name)
        .with_attr("gidNumber", gid)
}

/// A shadow entry.
pub fn shadow(login: &str, hash: &str) -> DirectoryEntry {
    DirectoryEntry::new(format!("uid={login},ou=people,dc=example,dc=com"))
        .with_attr("uid", login)
        .with_attr("userPassword", hash)
        .with_attr("shadowLastChange", "19000")
}

/// Two valid accounts plus one with `uidNumber=0`, two groups and shadow
/// data for one account.
pub fn fixture_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    directory.set_accounts(vec![
        account("alice", "1000", "100"),
        account("bob", "1001", "100"),
        account("root", "0", "0"),
    ]);
    directory.set_groups(vec![
        group("users", "100").with_attrs("memberUid", ["alice", "bob"]),
        group("admins", "101")
            .with_attr("memberUid", "alice")
            .with_attr("member", "uid=carol,ou=people,dc=example,dc=com"),
    ]);
    directory.set_shadow(vec![shadow("alice", "{CRYPT}$6$salt$hash")]);
    directory
}

/// Waits for the server to accept requests.
async fn wait_for_server(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let health_url = format!("{}/health/live", base_url);
    let max_attempts = 50;

    for attempt in 1..=max_attempts {
        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Server ready after {} attempts", attempt);
                return Ok(());
            }
            Ok(response) => {
                tracing::debug!(
                    "Server not ready (status {}), attempt {}/{}",
                    response.status(),
                    attempt,
                    max_attempts
                );
            }
            Err(e) => {
                tracing::debug!("Server not ready ({}), attempt {}/{}", e, attempt, max_attempts);
            }
        }
        sleep(Duration::from_millis(100)).await;
    }

    anyhow::bail!("Server did not become ready in time")
}
