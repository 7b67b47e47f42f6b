//! Restore Integration Tests
//!
//! Channel membership written by one server process is restored by the next
//! one using the same store.
//!
//! The Redis test requires a running Redis instance and `REDIS_URL`; it is
//! skipped otherwise.
//!
//! Run with: cargo test -p integration-tests --test restore_tests

use integration_tests::{no_opts, redis_url, unique_channel, unique_suffix, ClusterSpec, TestCluster};
use lobby_cache::{RedisChannelStore, RedisPool, RedisPoolConfig};
use lobby_core::{ChannelStore, MemoryStore};
use serde_json::json;
use std::sync::Arc;

async fn write_membership(spec: ClusterSpec, name: &str) {
    let cluster = TestCluster::start_with(spec).await.unwrap();
    let channels = cluster.server("front-1").state.channels();

    let channel = channels.create_channel(name);
    channel.add("alice", "front-1");
    channel.add("bob", "front-1");
    channel.add("carol", "front-1");
    channel.leave("carol", "front-1");

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_memory_store_restores_membership() {
    let store: Arc<dyn ChannelStore> = Arc::new(MemoryStore::new());
    let name = unique_channel();

    write_membership(ClusterSpec::new(&["front-1"]).store("front-1", store.clone()), &name).await;

    let cluster = TestCluster::start_with(ClusterSpec::new(&["front-1"]).store("front-1", store))
        .await
        .unwrap();
    let front1 = cluster.server("front-1");
    let channel = front1.state.channels().get_channel(&name, false).unwrap();

    assert_eq!(channel.get_user_amount(), 2);
    let mut members = channel.get_members();
    members.sort();
    assert_eq!(members, vec!["alice".to_string(), "bob".to_string()]);

    let (_, alice) = front1.connect_as("alice").await.unwrap();
    let failed = channel
        .push_message("onChat", &json!({"text": "back"}), no_opts())
        .await
        .unwrap();

    assert_eq!(failed, vec!["bob".to_string()]);
    assert_eq!(alice.received_on("onChat").len(), 1);
}

#[tokio::test]
async fn test_destroyed_channel_is_not_restored() {
    let store: Arc<dyn ChannelStore> = Arc::new(MemoryStore::new());
    let name = unique_channel();

    {
        let cluster =
            TestCluster::start_with(ClusterSpec::new(&["front-1"]).store("front-1", store.clone()))
                .await
                .unwrap();
        let channels = cluster.server("front-1").state.channels();
        channels.create_channel(&name).add("alice", "front-1");
        channels.destroy_channel(&name);
        cluster.shutdown().await;
    }

    let cluster = TestCluster::start_with(ClusterSpec::new(&["front-1"]).store("front-1", store))
        .await
        .unwrap();
    assert!(cluster
        .server("front-1")
        .state
        .channels()
        .get_channel(&name, false)
        .is_none());
}

#[tokio::test]
async fn test_redis_store_restores_membership() {
    let Some(url) = redis_url() else {
        return;
    };

    let pool = RedisPool::new(RedisPoolConfig {
        url,
        ..RedisPoolConfig::default()
    })
    .expect("Failed to create Redis pool");
    let store: Arc<dyn ChannelStore> = Arc::new(RedisChannelStore::new(pool));
    let prefix = format!("lobby-test-{}", unique_suffix());
    let name = unique_channel();

    let spec = || {
        ClusterSpec::new(&["front-1"])
            .var("CHANNEL_PREFIX", &prefix)
            .store("front-1", store.clone())
    };

    write_membership(spec(), &name).await;

    let cluster = TestCluster::start_with(spec()).await.unwrap();
    let channels = cluster.server("front-1").state.channels();
    let channel = channels.get_channel(&name, false).unwrap();
    assert_eq!(channel.get_user_amount(), 2);

    // Leave nothing behind
    channels.destroy_channel(&name);
    cluster.shutdown().await;
}
