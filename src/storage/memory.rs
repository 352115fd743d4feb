use super::tree::{get_at, remove_at, set_at};
use super::{KeyedRecordStore, PendingAppend, PushKeyGenerator, RawTree, SnapshotFile, Subscription};
use crate::core::{Fields, Result, SharedClock, StorePath, system_clock};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{RwLock, mpsc};

struct Subscriber {
    path: StorePath,
    sender: mpsc::UnboundedSender<RawTree>,
}

struct StoreInner {
    /// The whole document tree; writers hold the write lock while publishing
    tree: RwLock<Value>,
    /// Live subscribers, keyed by subscription id
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_subscriber: AtomicU64,
    keys: PushKeyGenerator,
}

impl StoreInner {
    /// Push the current subtree to every subscriber overlapping `changed`.
    /// Subscribers whose receiver is gone are dropped.
    fn publish(&self, tree: &Value, changed: &StorePath) -> Result<()> {
        let mut subscribers = self.subscribers.lock()?;
        subscribers.retain(|_, subscriber| {
            if !subscriber.path.overlaps(changed) {
                return true;
            }
            let snapshot = get_at(tree, &subscriber.path).cloned();
            subscriber.sender.send(snapshot).is_ok()
        });
        Ok(())
    }
}

/// Process-local realtime store.
///
/// Cloning gives another handle onto the same tree, the way separate
/// clients share one remote database.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Key timestamps come from `clock`.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self::from_tree_with_clock(Value::Object(Map::new()), clock)
    }

    pub fn from_tree(tree: Value) -> Self {
        Self::from_tree_with_clock(tree, system_clock())
    }

    pub fn from_tree_with_clock(tree: Value, clock: SharedClock) -> Self {
        let tree = match super::tree::prune(tree) {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self {
            inner: Arc::new(StoreInner {
                tree: RwLock::new(tree),
                subscribers: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(1),
                keys: PushKeyGenerator::new(clock),
            }),
        }
    }

    /// Restore a store from a snapshot file; a missing file gives an empty store.
    pub async fn open_snapshot(file: &SnapshotFile) -> Result<Self> {
        match file.load().await? {
            Some(snapshot) => Ok(Self::from_tree(snapshot.tree)),
            None => Ok(Self::new()),
        }
    }

    pub async fn save_snapshot(&self, file: &SnapshotFile) -> Result<()> {
        let tree = self.export_tree().await;
        file.save(tree).await
    }

    /// Copy of the whole tree.
    pub async fn export_tree(&self) -> Value {
        self.inner.tree.read().await.clone()
    }

    /// Replace the whole tree and notify every subscriber.
    pub async fn replace_tree(&self, tree: Value) -> Result<()> {
        self.apply(&StorePath::root(), Some(tree)).await
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    async fn apply(&self, path: &StorePath, value: Option<Value>) -> Result<()> {
        let mut tree = self.inner.tree.write().await;
        match value {
            Some(value) if path.is_root() => {
                *tree = match super::tree::prune(value) {
                    Value::Null => Value::Object(Map::new()),
                    other => other,
                };
            }
            Some(value) => set_at(&mut tree, path, value),
            None => {
                remove_at(&mut tree, path);
            }
        }
        log::debug!("store write at '{}'", path);
        self.inner.publish(&tree, path)
    }

    fn release_handle(inner: Weak<StoreInner>, id: u64) -> Box<dyn FnOnce() + Send + Sync> {
        Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                if let Ok(mut subscribers) = inner.subscribers.lock() {
                    subscribers.remove(&id);
                }
            }
        })
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyedRecordStore for InMemoryStore {
    async fn subscribe_tree(&self, path: &StorePath) -> Result<Subscription> {
        // Holding the read lock keeps writers out until we are registered,
        // so no change can slip between the snapshot and the first notification.
        let tree = self.inner.tree.read().await;
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(get_at(&tree, path).cloned());

        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);
        self.inner.subscribers.lock()?.insert(
            id,
            Subscriber {
                path: path.clone(),
                sender,
            },
        );
        drop(tree);

        Ok(Subscription::new(
            path.clone(),
            receiver,
            Self::release_handle(Arc::downgrade(&self.inner), id),
        ))
    }

    async fn read_tree(&self, path: &StorePath) -> Result<RawTree> {
        let tree = self.inner.tree.read().await;
        Ok(get_at(&tree, path).cloned())
    }

    async fn write_field(&self, path: &StorePath, value: Value) -> Result<()> {
        self.apply(path, Some(value)).await
    }

    async fn write_object(&self, path: &StorePath, value: Value) -> Result<()> {
        self.apply(path, Some(value)).await
    }

    fn append_record(&self, path: &StorePath, fields: Fields) -> Result<PendingAppend> {
        let key = self.inner.keys.next_key()?;
        let record_path = path.child(key.as_str())?;
        let store = self.clone();
        Ok(PendingAppend::new(
            key,
            Box::pin(async move { store.apply(&record_path, Some(Value::Object(fields))).await }),
        ))
    }

    async fn delete_record(&self, path: &StorePath) -> Result<()> {
        self.apply(path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn subscription_starts_with_current_snapshot() {
        let store = InMemoryStore::from_tree(json!({"features": {"k1": {"order": 0}}}));
        let mut sub = store.subscribe_tree(&path("features")).await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!({"k1": {"order": 0}}))));
    }

    #[tokio::test]
    async fn absent_path_delivers_none() {
        let store = InMemoryStore::new();
        let mut sub = store.subscribe_tree(&path("reviews")).await.unwrap();
        assert_eq!(sub.next().await, Some(None));
    }

    #[tokio::test]
    async fn writes_echo_to_overlapping_subscribers_only() {
        let store = InMemoryStore::new();
        let mut features = store.subscribe_tree(&path("features")).await.unwrap();
        let mut services = store.subscribe_tree(&path("services")).await.unwrap();
        features.latest();
        services.latest();

        store
            .write_field(&path("features/k1/name"), json!("Fast"))
            .await
            .unwrap();

        assert_eq!(features.latest(), Some(Some(json!({"k1": {"name": "Fast"}}))));
        assert_eq!(services.latest(), None);
    }

    #[tokio::test]
    async fn descendant_subscribers_see_ancestor_writes() {
        let store = InMemoryStore::new();
        let mut monthly = store.subscribe_tree(&path("pricing/monthly")).await.unwrap();
        monthly.latest();

        store
            .write_object(&path("pricing"), json!({"monthly": {"p": {"title": "Pro"}}}))
            .await
            .unwrap();

        assert_eq!(monthly.latest(), Some(Some(json!({"p": {"title": "Pro"}}))));
    }

    #[tokio::test]
    async fn append_returns_key_before_write_resolves() {
        let store = InMemoryStore::new();
        let mut fields = Fields::new();
        fields.insert("name".into(), json!("A"));

        let pending = store.append_record(&path("features"), fields).unwrap();
        let key = pending.key().clone();
        assert!(store.read_tree(&path("features")).await.unwrap().is_none());

        let durable = pending.durable().await.unwrap();
        assert_eq!(durable, key);
        let stored = store.read_tree(&path("features")).await.unwrap().unwrap();
        assert_eq!(stored[key.as_str()]["name"], json!("A"));
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let store = InMemoryStore::new();
        let sub = store.subscribe_tree(&path("features")).await.unwrap();
        assert_eq!(store.subscriber_count(), 1);
        drop(sub);
        assert_eq!(store.subscriber_count(), 0);

        let sub = store.subscribe_tree(&path("features")).await.unwrap();
        sub.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn delete_removes_subtree() {
        let store = InMemoryStore::from_tree(json!({"contacts": {"a": {"name": "x"}, "b": {"name": "y"}}}));
        store.delete_record(&path("contacts/a")).await.unwrap();
        assert_eq!(
            store.read_tree(&path("contacts")).await.unwrap(),
            Some(json!({"b": {"name": "y"}}))
        );
    }
}
