use std::sync::Arc;
use std::time::Duration;

use d_mirror::ConfigKey;
use d_mirror::ConfigMirror;
use d_mirror::Error;
use d_mirror::MemoryStore;
use d_mirror::MirrorConfig;
use d_mirror::RemoteStore;
use d_mirror::SubscriptionConfig;

use crate::common::recording_registry;

fn offline_config(subscriptions: Vec<SubscriptionConfig>) -> MirrorConfig {
    let mut config = MirrorConfig::default();
    config.local.app_name = "integration-offline".into();
    config.local.offline_mode = true;
    config.subscribe = subscriptions;
    config
}

#[tokio::test]
async fn test_offline_snapshot_is_static() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    store.seed(ConfigKey::new("APP", "timeout"), "30");
    store.seed(ConfigKey::new("APP", "retries"), "3");
    let (registry, deliveries) = recording_registry(&["app", "all"]);
    let mirror = ConfigMirror::builder(store.clone())
        .config(offline_config(vec![
            SubscriptionConfig::new("APP", "timeout", "app"),
            SubscriptionConfig::new("APP", "*", "all"),
        ]))
        .registry(registry)
        .build()?;

    mirror.reconcile(true).await?;

    assert_eq!(mirror.get("APP", "timeout"), "30");
    assert!(!mirror.contains("APP", "retries"));
    assert_eq!(*deliveries.lock(), vec!["app:APP/timeout=30"]);

    // Later remote changes never reach an offline mirror
    store.publish(&ConfigKey::new("APP", "timeout"), "60").await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mirror.get("APP", "timeout"), "30");
    assert_eq!(store.watched_key_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_offline_publish_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let (registry, _) = recording_registry(&["app"]);
    let mirror = ConfigMirror::builder(store.clone())
        .config(offline_config(vec![SubscriptionConfig::new("APP", "timeout", "app")]))
        .registry(registry)
        .build()?;

    let err = mirror.publish("APP", "timeout", "1").await.unwrap_err();

    assert!(matches!(err, Error::Offline));
    assert_eq!(err.to_string(), "config is offline mode");
    assert!(store.fetch(&ConfigKey::new("APP", "timeout")).await.is_err());
    Ok(())
}
