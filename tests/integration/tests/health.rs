//! Health endpoint tests.

use nss_directory::memory::Operation;

use crate::common::{fixture_directory, TestEnv};

#[tokio::test]
async fn test_health_reports_counts() {
    let env = TestEnv::new().await.expect("Failed to create test env");

    let json = env.get_json("/health").await.unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["users"], 2);
    assert_eq!(json["groups"], 2);
    assert_eq!(json["shadow"], 1);
    assert!(json["last_fetch"].is_string());
    assert!(json["cache_age"].as_str().unwrap().ends_with('s'));

    env.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_liveness_and_readiness() {
    let env = TestEnv::new().await.expect("Failed to create test env");

    assert_eq!(env.get("/health/live").await.unwrap().status(), 200);
    assert_eq!(env.get("/health/ready").await.unwrap().status(), 200);

    env.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_refresh_keeps_serving_previous_snapshot() {
    let env = TestEnv::new().await.expect("Failed to create test env");
    let before = env.get_json("/health").await.unwrap();

    env.directory.fail(Operation::Connect, "connection refused");
    assert!(env.cache.refresh().await.is_err());

    let after = env.get_json("/health").await.unwrap();
    assert_eq!(after["users"], before["users"]);
    assert_eq!(after["last_fetch"], before["last_fetch"]);
    assert_eq!(env.get("/health/ready").await.unwrap().status(), 200);

    let body = env.get_text("/passwd").await.unwrap();
    assert_eq!(body.lines().count(), 2);

    env.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stale_snapshot_fails_readiness() {
    let config = r#"
ldap:
  host: ldap.example.com
  base_dn: dc=example,dc=com
cache:
  ttl: 300
  stale_after: 1
server:
  listen: 127.0.0.1:0
"#;
    let env = TestEnv::with_directory(fixture_directory(), config)
        .await
        .expect("Failed to create test env");

    env.directory.fail(Operation::FetchAccounts, "unavailable");
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let json = env.get_json("/health").await.unwrap();
    assert_eq!(json["status"], "stale");
    assert_eq!(env.get("/health/ready").await.unwrap().status(), 503);

    env.shutdown().await.unwrap();
}
