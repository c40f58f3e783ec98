//! # nss-server
//!
//! HTTP gateway serving directory accounts to NSS clients.
//!
//! The server keeps a [`SnapshotCache`] fresh in the background and exposes
//! its contents as JSON and as `passwd`/`group`/`shadow` flat files:
//!
//! - `/passwd`, `/group`, `/shadow` and their `.json` variants
//! - `/health`, `/health/live`, `/health/ready`
//!
//! ## Usage
//!
//! ```ignore
//! use nss_server::{GatewayConfig, Server};
//!
//! let config = GatewayConfig::load("config.yaml")?;
//! let server = Server::new(config)?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::{GatewayConfig, LogFormat, LoggingConfig};
pub use router::create_router;
pub use state::AppState;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use nss_cache::SnapshotCache;
use nss_directory::{LdapDirectoryClient, RecordMapper};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The NSS gateway server.
pub struct Server {
    config: GatewayConfig,
    cache: Arc<SnapshotCache>,
}

impl Server {
    /// Creates a server backed by the configured LDAP directory.
    ///
    /// No connection is made until [`Server::run`].
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let client = LdapDirectoryClient::new(config.ldap.clone())?;
        let mapper = RecordMapper::new(config.ldap.attributes.clone());
        let cache = SnapshotCache::new(Arc::new(client), mapper, config.cache.settings());

        tracing::info!(
            endpoint = %config.ldap.connection_url(),
            base_dn = %config.ldap.base_dn,
            "Directory client configured"
        );

        Ok(Self::with_cache(config, Arc::new(cache)))
    }

    /// Creates a server around an existing cache.
    #[must_use]
    pub fn with_cache(config: GatewayConfig, cache: Arc<SnapshotCache>) -> Self {
        Self { config, cache }
    }

    /// Runs the server until Ctrl-C or SIGTERM.
    ///
    /// The listener is bound before the initial refresh, so an unusable
    /// address fails without contacting the directory.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Binds the configured listen address.
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        let addr = self.config.listen_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        tracing::info!("Server listening on http://{}", addr);
        Ok(listener)
    }

    /// Loads the cache, then serves on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cache
            .start()
            .await
            .context("initial directory refresh failed")?;

        let app = self.router();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        self.cache.stop();
        result?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the snapshot cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Builds the router without starting the server.
    pub fn router(&self) -> Router {
        let state = AppState::new(Arc::clone(&self.cache), self.config.cache.stale_after());
        create_router(state)
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
