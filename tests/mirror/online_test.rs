use std::sync::Arc;
use std::time::Duration;

use d_mirror::ConfigKey;
use d_mirror::ConfigMirror;
use d_mirror::MemoryStore;
use d_mirror::MirrorConfig;
use d_mirror::SubscriptionConfig;
use tracing_test::traced_test;

use crate::common::recording_registry;
use crate::common::wait_until;
use crate::common::TracingStore;

fn online_config(
    page_size: usize,
    subscriptions: Vec<SubscriptionConfig>,
) -> MirrorConfig {
    let mut config = MirrorConfig::default();
    config.local.app_name = "integration".into();
    config.local.search_page_size = page_size;
    config.subscribe = subscriptions;
    config
}

/// Lifecycle against the embedded store
///
/// Scenario:
/// 1. Seed values and reconcile with one exact and one pattern subscription
/// 2. Publish through the mirror and observe the change in cache and handler
/// 3. Publish an unrelated key and verify nothing is delivered for it
#[tokio::test]
#[traced_test]
async fn test_online_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    store.seed(ConfigKey::new("APP", "db.url"), "postgres://a");
    store.seed(ConfigKey::new("FLAGS-1", "rollout"), "10");
    store.seed(ConfigKey::new("FLAGS-2", "rollout"), "20");

    let (registry, deliveries) = recording_registry(&["db", "flags"]);
    let mirror = ConfigMirror::builder(store.clone())
        .config(online_config(
            1000,
            vec![
                SubscriptionConfig::new("APP", "db.url", "db"),
                SubscriptionConfig::new("FLAGS-*", "rollout", "flags"),
            ],
        ))
        .registry(registry)
        .build()?;

    mirror.reconcile(true).await?;

    assert_eq!(mirror.get("APP", "db.url"), "postgres://a");
    assert_eq!(mirror.get("FLAGS-1", "rollout"), "10");
    assert_eq!(mirror.get("FLAGS-2", "rollout"), "20");
    assert_eq!(mirror.cache().len(), 3);

    mirror.publish("FLAGS-2", "rollout", "50").await?;
    wait_until(|| mirror.get("FLAGS-2", "rollout") == "50").await;
    wait_until(|| deliveries.lock().len() == 4).await;
    assert_eq!(
        deliveries.lock().last().map(String::as_str),
        Some("flags:FLAGS-2/rollout=50")
    );

    mirror.publish("APP", "other", "x").await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!mirror.contains("APP", "other"));
    assert_eq!(deliveries.lock().len(), 4);

    Ok(())
}

#[tokio::test]
async fn test_pattern_resolution_pages_through_results() -> Result<(), Box<dyn std::error::Error>> {
    let memory = MemoryStore::new();
    for i in 0..5 {
        memory.seed(ConfigKey::new("G", format!("item-{i}")), format!("v{i}"));
    }
    let store = Arc::new(TracingStore::new(memory));
    let (registry, deliveries) = recording_registry(&["items"]);
    let mirror = ConfigMirror::builder(store.clone())
        .config(online_config(2, vec![SubscriptionConfig::new("G", "item-*", "items")]))
        .registry(registry)
        .build()?;

    mirror.reconcile(true).await?;

    let searches: Vec<String> = store
        .calls()
        .into_iter()
        .filter(|call| call.starts_with("search"))
        .collect();
    assert_eq!(
        searches,
        vec!["search G::item-* 1/2", "search G::item-* 2/2", "search G::item-* 3/2"]
    );
    for i in 0..5 {
        assert_eq!(mirror.get("G", &format!("item-{i}")), format!("v{i}"));
    }
    assert_eq!(deliveries.lock().len(), 5);

    Ok(())
}

#[tokio::test]
async fn test_listeners_are_registered_on_resolved_keys() -> Result<(), Box<dyn std::error::Error>> {
    let memory = MemoryStore::new();
    memory.seed(ConfigKey::new("G", "a"), "1");
    memory.seed(ConfigKey::new("G", "b"), "2");
    let store = Arc::new(TracingStore::new(memory));
    let (registry, _) = recording_registry(&["h"]);
    let mirror = ConfigMirror::builder(store.clone())
        .config(online_config(1000, vec![SubscriptionConfig::new("G", "*", "h")]))
        .registry(registry)
        .build()?;

    mirror.reconcile(true).await?;

    let calls = store.calls();
    assert!(calls.contains(&"listen G::a".to_string()));
    assert!(calls.contains(&"listen G::b".to_string()));
    assert!(!calls.iter().any(|call| call == "listen G::*" || call == "fetch G::*"));
    assert_eq!(store.inner.listener_count(&ConfigKey::new("G", "a")), 1);

    Ok(())
}

/// A change pushed while the pass is still registering listeners must not
/// be overwritten by the drain
#[tokio::test]
async fn test_push_during_registration_wins_over_drain() -> Result<(), Box<dyn std::error::Error>> {
    let memory = MemoryStore::new();
    memory.seed(ConfigKey::new("G", "D"), "old");
    let store = Arc::new(TracingStore::new(memory).with_listen_delay(Duration::from_millis(200)));
    let (registry, deliveries) = recording_registry(&["h"]);
    let mirror = ConfigMirror::builder(store.clone())
        .config(online_config(1000, vec![SubscriptionConfig::new("G", "D", "h")]))
        .registry(registry)
        .build()?;

    let handle = mirror.spawn_reconcile()?;
    wait_until(|| store.calls().iter().any(|call| call == "listen G::D")).await;
    mirror.publish("G", "D", "fresh").await?;
    wait_until(|| mirror.get("G", "D") == "fresh").await;

    let report = handle.await??;

    assert_eq!(report.fetched, 0);
    assert_eq!(mirror.get("G", "D"), "fresh");
    assert_eq!(*deliveries.lock(), vec!["h:G/D=fresh"]);

    Ok(())
}

#[tokio::test]
async fn test_missing_exact_key_fails_blocking_reconcile() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, _) = recording_registry(&["h"]);
    let mirror = ConfigMirror::builder(Arc::new(MemoryStore::new()))
        .config(online_config(1000, vec![SubscriptionConfig::new("G", "absent", "h")]))
        .registry(registry)
        .build()?;

    let err = mirror.reconcile(true).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "get config error: group[G] dataID[absent]; config not found"
    );
    Ok(())
}
