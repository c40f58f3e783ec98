//! Record endpoint tests.

use reqwest::header::CONTENT_TYPE;

use crate::common::{account, TestEnv};

#[tokio::test]
async fn test_passwd_flat() {
    let env = TestEnv::new().await.expect("Failed to create test env");

    let response = env.get("/passwd").await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()[CONTENT_TYPE].to_str().unwrap(),
        "text/plain; charset=utf-8"
    );

    let body = response.text().await.unwrap();
    assert_eq!(
        body,
        "alice:x:1000:100:alice user:/home/alice:/bin/bash\n\
         bob:x:1001:100:bob user:/home/bob:/bin/bash\n"
    );

    env.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_passwd_json_skips_zero_uid() {
    let env = TestEnv::new().await.expect("Failed to create test env");

    let json = env.get_json("/passwd.json").await.unwrap();
    let accounts = json.as_array().unwrap();
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|a| a["name"] != "root"));
    assert_eq!(accounts[1]["uid"], 1001);
    assert_eq!(accounts[1]["passwd"], "x");
    assert_eq!(accounts[1]["dir"], "/home/bob");

    env.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_group_members() {
    let env = TestEnv::new().await.expect("Failed to create test env");

    let body = env.get_text("/group").await.unwrap();
    assert_eq!(body, "users:x:100:alice,bob\nadmins:x:101:alice,carol\n");

    let json = env.get_json("/group.json").await.unwrap();
    assert_eq!(json[1]["name"], "admins");
    assert_eq!(json[1]["gid"], 101);
    assert_eq!(json[1]["members"], serde_json::json!(["alice", "carol"]));

    env.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shadow_strips_scheme_and_blanks_unset_fields() {
    let env = TestEnv::new().await.expect("Failed to create test env");

    let body = env.get_text("/shadow").await.unwrap();
    assert_eq!(body, "alice:$6$salt$hash:19000:0:99999:7:::\n");

    let json = env.get_json("/shadow.json").await.unwrap();
    let record = &json[0];
    assert_eq!(record["name"], "alice");
    assert_eq!(record["max"], 99999);
    assert_eq!(record["warn"], 7);
    assert_eq!(record["expire"], -1);
    assert_eq!(record["flag"], -1);

    env.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_refresh_publishes_new_data() {
    let env = TestEnv::new().await.expect("Failed to create test env");

    env.directory.set_accounts(vec![
        account("alice", "1000", "100"),
        account("dave", "1003", "100"),
    ]);
    env.cache.refresh().await.unwrap();

    let body = env.get_text("/passwd").await.unwrap();
    assert!(body.contains("dave:x:1003:100:"));
    assert!(!body.contains("bob:"));

    env.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_path_and_method() {
    let env = TestEnv::new().await.expect("Failed to create test env");

    let response = env.get("/netgroup").await.unwrap();
    assert_eq!(response.status(), 404);

    let response = env
        .client
        .post(format!("{}/passwd", env.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);

    env.shutdown().await.unwrap();
}
