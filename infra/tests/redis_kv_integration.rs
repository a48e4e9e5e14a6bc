//! Integration tests for the Redis key-value store
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p nest_infra --test redis_kv_integration -- --ignored

use nest_core::repositories::KeyValueStore;
use nest_infra::kv::RedisKeyValueStore;
use nest_shared::config::CacheConfig;

fn config() -> CacheConfig {
    CacheConfig::new(
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
    )
    .with_prefix(format!("staynest-test-{}", uuid::Uuid::new_v4().simple()))
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_redis_connection() {
    let store = RedisKeyValueStore::connect(config()).await.unwrap();
    assert!(store.ping().await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_set_get_remove() {
    let store = RedisKeyValueStore::connect(config()).await.unwrap();

    assert_eq!(store.get("session").await.unwrap(), None);
    store.set("session", "user-42").await.unwrap();
    assert_eq!(store.get("session").await.unwrap().as_deref(), Some("user-42"));

    store.remove("session").await.unwrap();
    assert_eq!(store.get("session").await.unwrap(), None);
    // Removing again is harmless
    store.remove("session").await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_fails_to_connect() {
    let config = CacheConfig {
        url: "redis://127.0.0.1:1".to_string(),
        connection_timeout: 1,
        key_prefix: None,
    };
    assert!(RedisKeyValueStore::connect(config).await.is_err());
}
