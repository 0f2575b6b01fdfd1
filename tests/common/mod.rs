use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use d_mirror::ChangeListener;
use d_mirror::ConfigItem;
use d_mirror::ConfigKey;
use d_mirror::HandlerRegistry;
use d_mirror::MemoryStore;
use d_mirror::RemoteStore;
use d_mirror::StoreResult;
use parking_lot::Mutex;
use tokio::time::sleep;
use tokio::time::timeout;

pub const WAIT_TIMEOUT_IN_MS: u64 = 2000;

pub type Deliveries = Arc<Mutex<Vec<String>>>;

/// Registry whose handlers append `name:group/id=content` to a shared log
pub fn recording_registry(names: &[&'static str]) -> (HandlerRegistry, Deliveries) {
    let deliveries: Deliveries = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    for &name in names {
        let sink = deliveries.clone();
        registry.register(name, move |group, id, content| {
            sink.lock().push(format!("{name}:{group}/{id}={content}"));
        });
    }
    (registry, deliveries)
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_millis(WAIT_TIMEOUT_IN_MS), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// Store decorator that logs every call and can delay listener registration
pub struct TracingStore {
    pub inner: MemoryStore,
    pub calls: Mutex<Vec<String>>,
    pub listen_delay: Duration,
}

impl TracingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            listen_delay: Duration::ZERO,
        }
    }

    pub fn with_listen_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.listen_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RemoteStore for TracingStore {
    async fn fetch(
        &self,
        key: &ConfigKey,
    ) -> StoreResult<String> {
        self.calls.lock().push(format!("fetch {key}"));
        self.inner.fetch(key).await
    }

    async fn search(
        &self,
        pattern: &ConfigKey,
        page_no: usize,
        page_size: usize,
    ) -> StoreResult<Vec<ConfigItem>> {
        self.calls.lock().push(format!("search {pattern} {page_no}/{page_size}"));
        self.inner.search(pattern, page_no, page_size).await
    }

    async fn listen(
        &self,
        key: &ConfigKey,
        listener: ChangeListener,
    ) -> StoreResult<()> {
        self.calls.lock().push(format!("listen {key}"));
        self.inner.listen(key, listener).await?;
        if !self.listen_delay.is_zero() {
            sleep(self.listen_delay).await;
        }
        Ok(())
    }

    async fn publish(
        &self,
        key: &ConfigKey,
        content: &str,
    ) -> StoreResult<()> {
        self.calls.lock().push(format!("publish {key}"));
        self.inner.publish(key, content).await
    }
}
