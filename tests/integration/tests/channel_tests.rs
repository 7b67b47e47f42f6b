//! Channel Integration Tests
//!
//! Channels hosted on one server push to members connected to other servers
//! through the `/rpc` endpoint of each gateway.
//!
//! Run with: cargo test -p integration-tests --test channel_tests

use integration_tests::{binded_opts, no_opts, unique_channel, ClusterSpec, TestCluster};
use lobby_core::{LobbyError, Member};
use serde_json::json;

// ============================================================================
// Channel Push Tests
// ============================================================================

#[tokio::test]
async fn test_channel_push_reaches_members_across_servers() {
    let cluster = TestCluster::start(&["front-1", "front-2"]).await.unwrap();
    let front1 = cluster.server("front-1");
    let front2 = cluster.server("front-2");

    let (_, alice) = front1.connect_as("alice").await.unwrap();
    let (_, bob) = front2.connect_as("bob").await.unwrap();
    let (_, carol) = front2.connect_as("carol").await.unwrap();

    let channel = front1.state.channels().create_channel(&unique_channel());
    assert!(channel.add("alice", "front-1"));
    assert!(channel.add("bob", "front-2"));
    assert!(channel.add("carol", "front-2"));

    let failed = channel
        .push_message("onChat", &json!({"text": "hi"}), no_opts())
        .await
        .unwrap();

    assert!(failed.is_empty());
    for client in [&alice, &bob, &carol] {
        assert_eq!(client.received_on("onChat"), vec![json!({"text": "hi"})]);
    }

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_offline_member_is_reported() {
    let cluster = TestCluster::start(&["front-1", "front-2"]).await.unwrap();
    let (_, bob) = cluster.server("front-2").connect_as("bob").await.unwrap();

    let channel = cluster
        .server("front-1")
        .state
        .channels()
        .create_channel(&unique_channel());
    channel.add("bob", "front-2");
    channel.add("dave", "front-2");

    let failed = channel
        .push_message("onChat", &json!({"text": "hi"}), no_opts())
        .await
        .unwrap();

    assert_eq!(failed, vec!["dave".to_string()]);
    assert_eq!(bob.received_on("onChat").len(), 1);
}

#[tokio::test]
async fn test_unreachable_server_is_partial_failure() {
    let cluster = TestCluster::start_with(ClusterSpec::new(&["front-1"]).dead("front-9"))
        .await
        .unwrap();
    let front1 = cluster.server("front-1");
    let (_, alice) = front1.connect_as("alice").await.unwrap();

    let channel = front1.state.channels().create_channel(&unique_channel());
    channel.add("alice", "front-1");
    channel.add("zed", "front-9");

    let failed = channel
        .push_message("onChat", &json!({"text": "hi"}), no_opts())
        .await
        .unwrap();

    assert_eq!(failed, vec!["front-9".to_string()]);
    assert_eq!(alice.received_on("onChat").len(), 1);
}

#[tokio::test]
async fn test_every_server_unreachable_fails() {
    let cluster = TestCluster::start_with(ClusterSpec::new(&["front-1"]).dead("front-9"))
        .await
        .unwrap();

    let channel = cluster
        .server("front-1")
        .state
        .channels()
        .create_channel(&unique_channel());
    channel.add("zed", "front-9");

    let err = channel
        .push_message("onChat", &json!({"text": "hi"}), no_opts())
        .await
        .unwrap_err();

    assert!(matches!(err, LobbyError::AllTargetsFailed { attempted: 1 }));
}

#[tokio::test]
async fn test_empty_channel_push_succeeds() {
    let cluster = TestCluster::start(&["front-1"]).await.unwrap();
    let channel = cluster
        .server("front-1")
        .state
        .channels()
        .create_channel(&unique_channel());

    let failed = channel
        .push_message("onChat", &json!({}), no_opts())
        .await
        .unwrap();
    assert!(failed.is_empty());
}

#[tokio::test]
async fn test_leave_stops_delivery() {
    let cluster = TestCluster::start(&["front-1", "front-2"]).await.unwrap();
    let (_, bob) = cluster.server("front-2").connect_as("bob").await.unwrap();
    let (_, carol) = cluster.server("front-2").connect_as("carol").await.unwrap();

    let channel = cluster
        .server("front-1")
        .state
        .channels()
        .create_channel(&unique_channel());
    channel.add("bob", "front-2");
    channel.add("carol", "front-2");
    assert!(channel.leave("bob", "front-2"));
    assert!(!channel.leave("bob", "front-2"));
    assert_eq!(channel.get_user_amount(), 1);

    channel
        .push_message("onChat", &json!({"n": 1}), no_opts())
        .await
        .unwrap();

    assert!(bob.received_on("onChat").is_empty());
    assert_eq!(carol.received_on("onChat").len(), 1);
}

#[tokio::test]
async fn test_destroyed_channel_rejects_push() {
    let cluster = TestCluster::start(&["front-1"]).await.unwrap();
    let channels = cluster.server("front-1").state.channels();
    let name = unique_channel();
    let channel = channels.create_channel(&name);
    channel.add("alice", "front-1");

    channels.destroy_channel(&name);

    assert!(channels.get_channel(&name, false).is_none());
    assert!(!channel.add("bob", "front-1"));
    let err = channel
        .push_message("onChat", &json!({}), no_opts())
        .await
        .unwrap_err();
    assert!(matches!(err, LobbyError::ChannelDestroyed(_)));
}

// ============================================================================
// Service-level Push Tests
// ============================================================================

#[tokio::test]
async fn test_push_message_by_uids_across_servers() {
    let cluster = TestCluster::start(&["front-1", "front-2"]).await.unwrap();
    let (_, alice) = cluster.server("front-1").connect_as("alice").await.unwrap();
    let (_, bob) = cluster.server("front-2").connect_as("bob").await.unwrap();

    let failed = cluster
        .server("front-1")
        .state
        .channels()
        .push_message_by_uids(
            "onNotice",
            &json!({"level": "info"}),
            &[
                Member::new("alice", "front-1"),
                Member::new("bob", "front-2"),
                Member::new("nobody", ""),
            ],
            no_opts(),
        )
        .await
        .unwrap();

    assert!(failed.is_empty());
    assert_eq!(alice.received_on("onNotice").len(), 1);
    assert_eq!(bob.received_on("onNotice").len(), 1);
}

#[tokio::test]
async fn test_push_message_by_uids_requires_targets() {
    let cluster = TestCluster::start(&["front-1"]).await.unwrap();
    let err = cluster
        .server("front-1")
        .state
        .channels()
        .push_message_by_uids("onNotice", &json!({}), &[], no_opts())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_broadcast_to_server_type() {
    let cluster = TestCluster::start(&["front-1", "front-2"]).await.unwrap();
    let (_, anonymous) = cluster.server("front-1").connect();
    let (_, alice) = cluster.server("front-1").connect_as("alice").await.unwrap();
    let (_, bob) = cluster.server("front-2").connect_as("bob").await.unwrap();
    let channels = cluster.server("front-1").state.channels();

    let failed = channels
        .broadcast("connector", "onAnnounce", &json!({"n": 1}), no_opts())
        .await
        .unwrap();
    assert!(failed.is_empty());
    for client in [&anonymous, &alice, &bob] {
        assert_eq!(client.received_on("onAnnounce").len(), 1);
    }

    channels
        .broadcast("connector", "onAnnounce", &json!({"n": 2}), binded_opts())
        .await
        .unwrap();
    assert_eq!(anonymous.received_on("onAnnounce").len(), 1);
    assert_eq!(alice.received_on("onAnnounce").len(), 2);
    assert_eq!(bob.received_on("onAnnounce").len(), 2);
}

#[tokio::test]
async fn test_broadcast_without_servers_succeeds() {
    let cluster = TestCluster::start(&["front-1"]).await.unwrap();
    let failed = cluster
        .server("front-1")
        .state
        .channels()
        .broadcast("chat", "onAnnounce", &json!({}), no_opts())
        .await
        .unwrap();
    assert!(failed.is_empty());
}
