use std::io::Write;
use std::sync::Arc;

use d_mirror::ConfigKey;
use d_mirror::ConfigMirror;
use d_mirror::Error;
use d_mirror::MemoryStore;
use d_mirror::MirrorConfig;
use serial_test::serial;

use crate::common::recording_registry;

const MIRROR_TOML: &str = r#"
[local]
app_name = "file-app"
namespace_id = "prod"
search_page_size = 50

[[subscribe]]
group = "APP"
id = "db.url"
handler = "DB"

[[subscribe]]
group = "FEATURE*"
id = "enabled"
handler = "flags"
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

fn load(path: &str) -> d_mirror::Result<MirrorConfig> {
    temp_env::with_vars(
        [
            ("CONFIG_PATH", Some(path)),
            ("MIRROR__LOCAL__OFFLINE_MODE", None::<&str>),
            ("MIRROR__LOCAL__APP_NAME", None::<&str>),
        ],
        MirrorConfig::new,
    )
}

#[tokio::test]
#[serial]
async fn test_mirror_from_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_config(MIRROR_TOML);
    let config = load(file.path().to_str().unwrap_or_default())?.validate()?;
    assert_eq!(
        config.describe(),
        "app:file-app; namespaceID:prod; mode:online; subscriptions:2"
    );

    let store = Arc::new(MemoryStore::new());
    store.seed(ConfigKey::new("APP", "db.url"), "postgres://file");
    store.seed(ConfigKey::new("FEATURE-X", "enabled"), "true");
    // Handler names are matched case-insensitively
    let (registry, deliveries) = recording_registry(&["db", "FLAGS"]);
    let mut mirror = ConfigMirror::new(config, store);
    mirror.initialize(&registry)?;

    mirror.reconcile(true).await?;

    assert_eq!(mirror.get("APP", "db.url"), "postgres://file");
    assert_eq!(mirror.get("FEATURE-X", "enabled"), "true");
    assert_eq!(deliveries.lock().len(), 2);
    Ok(())
}

#[test]
#[serial]
fn test_config_file_without_subscriptions_is_rejected() {
    let file = write_config("[local]\napp_name = \"empty\"\n");
    let config = load(file.path().to_str().unwrap_or_default()).expect("load config");

    let err = config.validate().unwrap_err();

    assert!(matches!(err, Error::InvalidConfig(ref msg) if msg == "Subscribe Vars is empty"));
}
