//! Session Integration Tests
//!
//! Identity binding, kicks, and the gateway's HTTP surface.
//!
//! Run with: cargo test -p integration-tests --test session_tests

use integration_tests::{assert_json, no_opts, unique_channel, wait_until, ClusterSpec, TestCluster};
use lobby_core::{LobbyError, PushOptions, RpcMessage, SessionEvent};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let cluster = TestCluster::start(&["front-1"]).await.unwrap();
    let response = cluster.server("front-1").get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

// ============================================================================
// Binding Tests
// ============================================================================

#[tokio::test]
async fn test_kick_closes_every_session_of_uid() {
    let cluster = TestCluster::start(&["front-1"]).await.unwrap();
    let front1 = cluster.server("front-1");
    let sessions = front1.state.sessions();
    let mut events = sessions.subscribe();

    let (_, first) = front1.connect_as("7").await.unwrap();
    let (_, second) = front1.connect_as("7").await.unwrap();
    let (_, other) = front1.connect_as("8").await.unwrap();

    assert_eq!(sessions.kick("7", "banned").await, 2);
    assert!(sessions.get_by_uid("7").is_empty());
    assert_eq!(sessions.get_by_uid("8").len(), 1);

    assert!(
        wait_until(Duration::from_secs(1), || {
            first.is_disconnected() && second.is_disconnected()
        })
        .await
    );
    assert!(!other.is_disconnected());

    let mut closed = 0;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Closed { reason, .. } = event {
            assert_eq!(reason, "banned");
            closed += 1;
        }
    }
    assert_eq!(closed, 2);
}

#[tokio::test]
async fn test_kicked_uid_is_reported_on_push() {
    let cluster = TestCluster::start(&["front-1", "front-2"]).await.unwrap();
    let front2 = cluster.server("front-2");
    front2.connect_as("7").await.unwrap();

    let channel = cluster
        .server("front-1")
        .state
        .channels()
        .create_channel(&unique_channel());
    channel.add("7", "front-2");

    front2.state.sessions().kick("7", "kick").await;

    let failed = channel
        .push_message("onChat", &json!({}), no_opts())
        .await
        .unwrap();
    assert_eq!(failed, vec!["7".to_string()]);
}

#[tokio::test]
async fn test_single_session_conflict() {
    let cluster =
        TestCluster::start_with(ClusterSpec::new(&["front-1"]).var("SESSION_SINGLE", "true"))
            .await
            .unwrap();
    let front1 = cluster.server("front-1");
    front1.connect_as("7").await.unwrap();

    let (sid, _) = front1.connect();
    let err = front1.state.sessions().bind(sid, "7").await.unwrap_err();

    assert!(matches!(err, LobbyError::SingleSessionConflict(uid) if uid == "7"));
    assert!(front1.state.sessions().get(sid).unwrap().uid().is_none());
}

#[tokio::test]
async fn test_close_wins_over_pending_bind() {
    let cluster = TestCluster::start(&["front-1"]).await.unwrap();
    let front1 = cluster.server("front-1");
    let sessions = front1.state.sessions();
    let (sid, client) = front1.connect();

    let bind = sessions.bind(sid, "7");
    assert!(sessions.close(sid, "disconnect"));

    assert!(bind.await.is_err());
    assert!(sessions.get_by_uid("7").is_empty());
    assert!(wait_until(Duration::from_secs(1), || client.is_disconnected()).await);
}

// ============================================================================
// Inbound Invocation Tests
// ============================================================================

#[tokio::test]
async fn test_rpc_endpoint_returns_failed_uids() {
    let cluster = TestCluster::start(&["front-1"]).await.unwrap();
    let front1 = cluster.server("front-1");
    let (_, alice) = front1.connect_as("alice").await.unwrap();

    let message = RpcMessage::push_message(
        "onChat",
        &json!({"text": "hi"}),
        &["alice".to_string(), "ghost".to_string()],
        &PushOptions::default(),
    )
    .unwrap();
    let response = front1.post("/rpc", &message).await.unwrap();
    let failed: Vec<String> = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(failed, vec!["ghost".to_string()]);
    assert_eq!(alice.received_on("onChat"), vec![json!({"text": "hi"})]);
}

#[tokio::test]
async fn test_rpc_endpoint_rejects_unknown_service() {
    let cluster = TestCluster::start(&["front-1"]).await.unwrap();
    let response = cluster
        .server("front-1")
        .post(
            "/rpc",
            &json!({"namespace": "sys", "service": "nope", "method": "broadcast", "args": []}),
        )
        .await
        .unwrap();

    let body: Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["code"], "VALIDATION");
}

// ============================================================================
// Scheduler Tests
// ============================================================================

#[tokio::test]
async fn test_buffered_scheduler_coalesces_pushes() {
    let cluster = TestCluster::start_with(
        ClusterSpec::new(&["front-1", "front-2"])
            .var("PUSH_SCHEDULER", "buffered")
            .var("PUSH_FLUSH_INTERVAL_MS", "200"),
    )
    .await
    .unwrap();
    let (_, bob) = cluster.server("front-2").connect_as("bob").await.unwrap();

    let channel = cluster
        .server("front-1")
        .state
        .channels()
        .create_channel(&unique_channel());
    channel.add("bob", "front-2");

    for n in 0..2 {
        channel
            .push_message("onChat", &json!({"n": n}), no_opts())
            .await
            .unwrap();
    }

    assert!(wait_until(Duration::from_secs(2), || bob.received_on("onChat").len() == 2).await);
    assert_eq!(bob.write_count(), 1);
    assert_eq!(
        bob.received_on("onChat"),
        vec![json!({"n": 0}), json!({"n": 1})]
    );

    cluster.shutdown().await;
}
