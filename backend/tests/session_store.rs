use chrono::Utc;
use serde_json::json;

use keygate_backend::models::session::{NewSession, SessionUpdate};
use keygate_backend::models::token::TokenMeta;
use keygate_backend::services::cache::Cache;
use keygate_backend::utils::jwt::TokenKind;

mod support;
use support::{build_store, sample_session, SESSION_PREFIX, SESSION_TTL, TOKEN_PREFIX};

fn new_session(user_id: &str) -> NewSession {
    NewSession {
        tenant_id: "acme".to_string(),
        user_id: user_id.to_string(),
        app_id: Some("app-1".to_string()),
        ip_address: Some("203.0.113.9".to_string()),
        user_agent: Some("test-agent".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_session_writes_both_backends() {
    let harness = build_store();

    let session = harness
        .store
        .create_session(new_session("u-1"))
        .await
        .expect("create session");

    // Cache copy with the full session TTL.
    let key = format!("{SESSION_PREFIX}{}", session.session_id);
    let cached = harness.cache.get(&key).await.expect("cache get");
    assert!(cached.is_some());
    let ttl = harness.cache.ttl(&key).await.expect("ttl").expect("expiry");
    assert!(ttl > SESSION_TTL - 60 && ttl <= SESSION_TTL);

    // Durable copy flagged live.
    let row = harness.sessions.row(&session.session_id).expect("durable row");
    assert!(row.is_active);
    assert_eq!(row.tenant_id, "acme");
    assert_eq!(row.user_id, "u-1");
}

#[tokio::test]
async fn get_session_round_trips_through_cache() {
    let harness = build_store();
    let session = harness
        .store
        .create_session(new_session("u-1"))
        .await
        .expect("create session");

    let fetched = harness
        .store
        .get_session(&session.session_id)
        .await
        .expect("get session")
        .expect("found");
    assert_eq!(fetched.session_id, session.session_id);
    assert_eq!(fetched.user_id, "u-1");
}

#[tokio::test]
async fn evicted_session_is_repaired_from_durable_with_remaining_ttl() {
    let harness = build_store();

    // Durable-only session with 100 seconds left: as if the cache
    // entry had been evicted mid-lifetime.
    harness.sessions.seed(sample_session("s-evicted", "u-1", 100));

    let fetched = harness
        .store
        .get_session("s-evicted")
        .await
        .expect("get session")
        .expect("found despite cache miss");
    assert_eq!(fetched.session_id, "s-evicted");

    // Repaired cache entry carries the remaining TTL, not the original
    // session lifetime.
    let key = format!("{SESSION_PREFIX}s-evicted");
    let ttl = harness.cache.ttl(&key).await.expect("ttl").expect("expiry");
    assert!(ttl > 0 && ttl <= 100, "remaining ttl was {ttl}");
}

#[tokio::test]
async fn not_live_durable_session_is_gone() {
    let harness = build_store();
    let mut session = sample_session("s-revoked", "u-1", 100);
    session.is_active = false;
    harness.sessions.seed(session);

    let fetched = harness.store.get_session("s-revoked").await.expect("get");
    assert!(fetched.is_none());
}

#[tokio::test]
async fn expired_durable_session_is_gone() {
    let harness = build_store();
    harness.sessions.seed(sample_session("s-expired", "u-1", -10));

    let fetched = harness.store.get_session("s-expired").await.expect("get");
    assert!(fetched.is_none());
}

#[tokio::test]
async fn unknown_session_is_gone() {
    let harness = build_store();
    let fetched = harness.store.get_session("no-such-session").await.expect("get");
    assert!(fetched.is_none());
}

#[tokio::test]
async fn update_merges_fields_and_bumps_last_active() {
    let harness = build_store();
    let session = harness
        .store
        .create_session(new_session("u-1"))
        .await
        .expect("create session");
    let before = session.last_active;

    harness
        .store
        .update_session(
            &session.session_id,
            SessionUpdate {
                location: Some(json!({"country": "NZ"})),
                ..Default::default()
            },
        )
        .await
        .expect("update session");

    let row = harness.sessions.row(&session.session_id).expect("row");
    assert_eq!(row.location, Some(json!({"country": "NZ"})));
    // Fields not present in the update are untouched.
    assert_eq!(row.ip_address.as_deref(), Some("203.0.113.9"));
    assert!(row.last_active >= before);

    let fetched = harness
        .store
        .get_session(&session.session_id)
        .await
        .expect("get")
        .expect("found");
    assert_eq!(fetched.location, Some(json!({"country": "NZ"})));
}

#[tokio::test]
async fn delete_session_clears_cache_and_flags_durable_row() {
    let harness = build_store();
    let session = harness
        .store
        .create_session(new_session("u-1"))
        .await
        .expect("create session");

    harness
        .store
        .delete_session(&session.session_id)
        .await
        .expect("delete session");

    let key = format!("{SESSION_PREFIX}{}", session.session_id);
    assert!(harness.cache.get(&key).await.expect("get").is_none());

    // Retained for audit, flagged not-live.
    let row = harness.sessions.row(&session.session_id).expect("row kept");
    assert!(!row.is_active);

    assert!(harness
        .store
        .get_session(&session.session_id)
        .await
        .expect("get")
        .is_none());
}

#[tokio::test]
async fn mass_delete_retires_every_session_for_the_user() {
    let harness = build_store();
    let s1 = harness
        .store
        .create_session(new_session("u-1"))
        .await
        .expect("create");
    let s2 = harness
        .store
        .create_session(new_session("u-1"))
        .await
        .expect("create");
    let other = harness
        .store
        .create_session(new_session("u-2"))
        .await
        .expect("create");

    harness
        .store
        .delete_all_sessions_for_user("u-1")
        .await
        .expect("mass delete");

    assert!(harness.store.get_session(&s1.session_id).await.unwrap().is_none());
    assert!(harness.store.get_session(&s2.session_id).await.unwrap().is_none());
    // The other user is untouched.
    assert!(harness.store.get_session(&other.session_id).await.unwrap().is_some());
}

#[tokio::test]
async fn token_index_put_get_drop() {
    let harness = build_store();
    let meta = TokenMeta {
        user_id: "u-1".to_string(),
        session_id: "s-1".to_string(),
        kind: TokenKind::Access,
    };

    harness.store.put_token("tok-a", &meta, 60).await.expect("put");

    let fetched = harness.store.get_token("tok-a").await.expect("get").expect("present");
    assert_eq!(fetched.user_id, "u-1");
    assert_eq!(fetched.kind, TokenKind::Access);

    harness.store.drop_token("tok-a").await.expect("drop");
    assert!(harness.store.get_token("tok-a").await.expect("get").is_none());
}

#[tokio::test]
async fn take_token_consumes_exactly_once() {
    let harness = build_store();
    let meta = TokenMeta {
        user_id: "u-1".to_string(),
        session_id: "s-1".to_string(),
        kind: TokenKind::Refresh,
    };
    harness.store.put_token("tok-r", &meta, 60).await.expect("put");

    let first = harness.store.take_token("tok-r").await.expect("take");
    assert!(first.is_some());

    let second = harness.store.take_token("tok-r").await.expect("take again");
    assert!(second.is_none());
}

#[tokio::test]
async fn mass_token_drop_is_scoped_to_the_user() {
    let harness = build_store();
    let mine = TokenMeta {
        user_id: "u-1".to_string(),
        session_id: "s-1".to_string(),
        kind: TokenKind::Access,
    };
    let theirs = TokenMeta {
        user_id: "u-2".to_string(),
        session_id: "s-2".to_string(),
        kind: TokenKind::Access,
    };
    harness.store.put_token("tok-mine-1", &mine, 60).await.expect("put");
    harness.store.put_token("tok-mine-2", &mine, 60).await.expect("put");
    harness.store.put_token("tok-theirs", &theirs, 60).await.expect("put");

    harness
        .store
        .drop_all_tokens_for_user("u-1")
        .await
        .expect("mass drop");

    assert!(harness.store.get_token("tok-mine-1").await.unwrap().is_none());
    assert!(harness.store.get_token("tok-mine-2").await.unwrap().is_none());
    assert!(harness.store.get_token("tok-theirs").await.unwrap().is_some());

    // Index keys live under their own namespace.
    let keys = harness.cache.scan_prefix(TOKEN_PREFIX).await.expect("scan");
    assert_eq!(keys.len(), 1);
}

#[tokio::test]
async fn session_expiry_matches_configured_lifetime() {
    let harness = build_store();
    let session = harness
        .store
        .create_session(new_session("u-1"))
        .await
        .expect("create");

    let lifetime = (session.expires_at - session.created_at).num_seconds();
    assert_eq!(lifetime, SESSION_TTL as i64);
    assert!(session.expires_at > Utc::now());
}
