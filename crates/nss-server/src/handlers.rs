//! Request handlers.
//!
//! Every handler reads the snapshot once and renders from that copy, so a
//! response never mixes data from two refresh cycles.

use std::fmt::{self, Write as _};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

// ============================================================================
// Records
// ============================================================================

/// `GET /passwd.json`
pub async fn passwd_json(State(state): State<AppState>) -> Response {
    json_body(&*state.cache.accounts())
}

/// `GET /passwd`
pub async fn passwd_flat(State(state): State<AppState>) -> Response {
    flat_body(state.cache.accounts().iter())
}

/// `GET /group.json`
pub async fn group_json(State(state): State<AppState>) -> Response {
    json_body(&*state.cache.groups())
}

/// `GET /group`
pub async fn group_flat(State(state): State<AppState>) -> Response {
    flat_body(state.cache.groups().iter())
}

/// `GET /shadow.json`
pub async fn shadow_json(State(state): State<AppState>) -> Response {
    json_body(&*state.cache.shadow_records())
}

/// `GET /shadow`
pub async fn shadow_flat(State(state): State<AppState>) -> Response {
    flat_body(state.cache.shadow_records().iter())
}

fn json_body<T: Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// One record per line, each terminated by `\n`.
///
/// A record whose `Display` fails is left out whole, so a bad value can
/// never truncate or split a line.
fn flat_body<I>(records: I) -> Response
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    let mut body = String::new();
    let mut line = String::new();
    for record in records {
        line.clear();
        if writeln!(line, "{record}").is_err() {
            tracing::warn!("Skipping record that cannot be rendered");
            continue;
        }
        body.push_str(&line);
    }
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `stale` once the snapshot exceeds the staleness threshold.
    pub status: &'static str,
    /// Number of account records.
    pub users: usize,
    /// Number of group records.
    pub groups: usize,
    /// Number of shadow records.
    pub shadow: usize,
    /// Time of the last successful refresh.
    pub last_fetch: Option<DateTime<Utc>>,
    /// Snapshot age, e.g. `1h2m3s`.
    pub cache_age: Option<String>,
}

impl HealthResponse {
    fn build(state: &AppState, now: DateTime<Utc>) -> Self {
        let stats = state.cache.stats();
        let stale = state
            .stale_after
            .is_some_and(|limit| stats.is_stale(now, limit));

        Self {
            status: if stale { "stale" } else { "ok" },
            users: stats.accounts,
            groups: stats.groups,
            shadow: stats.shadow,
            last_fetch: stats.last_fetch,
            cache_age: stats.age(now).map(format_age),
        }
    }
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::build(&state, Utc::now()))
}

/// `GET /health/live`
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// `GET /health/ready`
///
/// Ready once a snapshot has been published and, when a staleness
/// threshold is configured, it has not been exceeded.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    let stats = state.cache.stats();
    let now = Utc::now();

    let ready = match state.stale_after {
        _ if stats.last_fetch.is_none() => false,
        Some(limit) => !stats.is_stale(now, limit),
        None => true,
    };

    if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Formats a duration rounded to whole seconds: `45s`, `2m5s`, `1h2m3s`.
pub fn format_age(age: Duration) -> String {
    let mut secs = age.as_secs();
    if age.subsec_millis() >= 500 {
        secs += 1;
    }
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use nss_cache::{CacheSettings, SnapshotCache};
    use nss_directory::memory::InMemoryDirectory;
    use nss_directory::{AttributeMap, DirectoryEntry, RecordMapper};

    use super::*;

    fn directory() -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        directory.set_accounts(vec![DirectoryEntry::new("uid=alice,dc=example,dc=com")
            .with_attr("uid", "alice")
            .with_attr("uidNumber", "1000")
            .with_attr("gidNumber", "100")
            .with_attr("cn", "Alice Liddell")
            .with_attr("homeDirectory", "/home/alice")
            .with_attr("loginShell", "/bin/bash")]);
        directory.set_groups(vec![DirectoryEntry::new("cn=users,dc=example,dc=com")
            .with_attr("cn", "users")
            .with_attr("gidNumber", "100")
            .with_attrs("memberUid", ["alice", "bob"])]);
        directory.set_shadow(vec![DirectoryEntry::new("uid=alice,dc=example,dc=com")
            .with_attr("uid", "alice")
            .with_attr("userPassword", "$6$abc$def")
            .with_attr("shadowLastChange", "19000")]);
        directory
    }

    fn state(directory: &InMemoryDirectory, stale_after: Option<Duration>) -> AppState {
        let cache = SnapshotCache::new(
            Arc::new(directory.clone()),
            RecordMapper::new(AttributeMap::default()),
            CacheSettings::new(Duration::from_secs(300)),
        );
        AppState::new(Arc::new(cache), stale_after)
    }

    async fn loaded(stale_after: Option<Duration>) -> AppState {
        let state = state(&directory(), stale_after);
        state.cache.refresh().await.unwrap();
        state
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    #[test]
    fn formats_age() {
        assert_eq!(format_age(Duration::ZERO), "0s");
        assert_eq!(format_age(Duration::from_secs(45)), "45s");
        assert_eq!(format_age(Duration::from_millis(44_600)), "45s");
        assert_eq!(format_age(Duration::from_secs(60)), "1m0s");
        assert_eq!(format_age(Duration::from_secs(125)), "2m5s");
        assert_eq!(format_age(Duration::from_secs(3723)), "1h2m3s");
        assert_eq!(format_age(Duration::from_secs(90_000)), "25h0m0s");
    }

    #[tokio::test]
    async fn passwd_endpoints_render_accounts() {
        let state = loaded(None).await;

        let response = passwd_flat(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), TEXT_PLAIN);
        assert_eq!(
            body_text(response).await,
            "alice:x:1000:100:Alice Liddell:/home/alice:/bin/bash\n"
        );

        let response = passwd_json(State(state)).await;
        assert_eq!(content_type(&response), "application/json");
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json[0]["name"], "alice");
        assert_eq!(json[0]["uid"], 1000);
    }

    #[tokio::test]
    async fn group_endpoints_render_members() {
        let state = loaded(None).await;

        let body = body_text(group_flat(State(state.clone())).await).await;
        assert_eq!(body, "users:x:100:alice,bob\n");

        let json: serde_json::Value =
            serde_json::from_str(&body_text(group_json(State(state)).await).await).unwrap();
        assert_eq!(json[0]["members"], serde_json::json!(["alice", "bob"]));
    }

    #[tokio::test]
    async fn shadow_endpoints_render_unset_fields() {
        let state = loaded(None).await;

        let body = body_text(shadow_flat(State(state.clone())).await).await;
        assert_eq!(body, "alice:$6$abc$def:19000:0:99999:7:::\n");

        let json: serde_json::Value =
            serde_json::from_str(&body_text(shadow_json(State(state)).await).await).unwrap();
        assert_eq!(json[0]["lastchg"], 19000);
        assert_eq!(json[0]["inactive"], -1);
    }

    #[tokio::test]
    async fn flat_body_skips_unrenderable_records() {
        use nss_model::{AccountRecord, GroupRecord};

        let accounts = vec![
            AccountRecord::new("alice", 1000, 100).with_shell("/bin/bash"),
            AccountRecord::new("mallory", 1005, 100).with_gecos("x:/home/m:/bin/sh\nevil::0:0:"),
            AccountRecord::new("bob", 1001, 100),
        ];
        let body = body_text(flat_body(accounts.iter())).await;
        assert_eq!(body, "alice:x:1000:100:::/bin/bash\nbob:x:1001:100:::\n");

        let groups = vec![GroupRecord::new("ops", 3000).with_members(["alice,root"])];
        assert_eq!(body_text(flat_body(groups.iter())).await, "");
    }

    #[tokio::test]
    async fn empty_cache_renders_empty_bodies() {
        let state = state(&directory(), None);

        assert_eq!(body_text(passwd_flat(State(state.clone())).await).await, "");
        assert_eq!(body_text(group_json(State(state)).await).await, "[]");
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let state = loaded(None).await;

        let Json(health) = health_check(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!((health.users, health.groups, health.shadow), (1, 1, 1));
        assert!(health.last_fetch.is_some());
        assert!(health.cache_age.is_some());
    }

    #[tokio::test]
    async fn health_reports_stale_snapshot() {
        let state = loaded(Some(Duration::from_secs(60))).await;
        let later = Utc::now() + chrono::Duration::seconds(3723);

        let health = HealthResponse::build(&state, later);
        assert_eq!(health.status, "stale");
        assert_eq!(health.cache_age.as_deref(), Some("1h2m3s"));
    }

    #[tokio::test]
    async fn readiness_follows_snapshot() {
        let state = state(&directory(), None);
        assert_eq!(liveness_check().await, StatusCode::OK);
        assert_eq!(
            readiness_check(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.cache.refresh().await.unwrap();
        assert_eq!(readiness_check(State(state)).await, StatusCode::OK);

        let fresh = loaded(Some(Duration::from_secs(3600))).await;
        assert_eq!(readiness_check(State(fresh)).await, StatusCode::OK);
    }
}
