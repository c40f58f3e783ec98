//! Startup and shutdown tests.

use std::sync::Arc;

use nss_cache::{CacheError, CacheSettings, SnapshotCache};
use nss_directory::memory::Operation;
use nss_directory::{AttributeMap, RecordMapper};
use nss_server::{GatewayConfig, Server};
use tokio::net::TcpListener;

use crate::common::{fixture_directory, TestEnv, CONFIG};

#[tokio::test]
async fn test_unreachable_directory_aborts_startup() {
    let directory = fixture_directory();
    directory.fail(Operation::Connect, "connection refused");

    let cache = Arc::new(SnapshotCache::new(
        Arc::new(directory.clone()),
        RecordMapper::new(AttributeMap::default()),
        CacheSettings::default(),
    ));
    let config = GatewayConfig::from_yaml(CONFIG).unwrap();
    let server = Server::with_cache(config, Arc::clone(&cache));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let err = server
        .serve(listener, std::future::pending())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("initial directory refresh failed"));
    assert!(matches!(
        err.downcast_ref::<CacheError>(),
        Some(CacheError::Directory(_))
    ));
    assert!(cache.last_fetch_time().is_none());
}

#[tokio::test]
async fn test_empty_directory_aborts_startup() {
    let directory = fixture_directory();
    directory.set_accounts(Vec::new());

    let result = TestEnv::with_directory(directory, CONFIG).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_graceful_shutdown_stops_cache() {
    let env = TestEnv::new().await.expect("Failed to create test env");
    let cache = Arc::clone(&env.cache);
    let directory = env.directory.clone();

    env.shutdown().await.unwrap();

    assert!(cache.is_stopped());
    assert_eq!(directory.connect_count(), 1);
    assert_eq!(directory.close_count(), 1);
    // The last snapshot stays readable after shutdown.
    assert_eq!(cache.stats().accounts, 2);
}
