pub mod keygen;
pub mod memory;
pub mod persistence;
pub mod tree;

pub use keygen::PushKeyGenerator;
pub use memory::InMemoryStore;
pub use persistence::{SnapshotFile, StoreSnapshot};

use crate::core::{Fields, RecordKey, Result, StorePath};
use async_trait::async_trait;
use futures::Stream;
use futures::future::BoxFuture;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Store handle shared by views, editors and forms.
pub type SharedStore = Arc<dyn KeyedRecordStore>;

/// Whole subtree under a watched path, or `None` when nothing is stored there.
pub type RawTree = Option<Value>;

/// Key-path store with live subtree subscriptions.
///
/// Every write is observed by all subscriptions whose path overlaps the
/// written path, including the writer's own (echo). Writes are
/// last-write-wins with no conflict detection.
#[async_trait]
pub trait KeyedRecordStore: Send + Sync {
    /// Subscribe to the subtree at `path`. The initial snapshot is queued
    /// before this returns.
    async fn subscribe_tree(&self, path: &StorePath) -> Result<Subscription>;

    /// One-shot read of the subtree at `path`.
    async fn read_tree(&self, path: &StorePath) -> Result<RawTree>;

    /// Upsert a single value at an exact path. Writing `null` removes it.
    async fn write_field(&self, path: &StorePath, value: Value) -> Result<()>;

    /// Replace the whole object at `path`.
    async fn write_object(&self, path: &StorePath, value: Value) -> Result<()>;

    /// Allocate a fresh key under `path` and write `fields` beneath it.
    ///
    /// The key is available immediately; it is durable once the returned
    /// [`PendingAppend`] resolves.
    fn append_record(&self, path: &StorePath, fields: Fields) -> Result<PendingAppend>;

    /// Remove the subtree at `path`.
    async fn delete_record(&self, path: &StorePath) -> Result<()>;
}

/// An append whose key is known but whose write may still be in flight.
#[must_use = "the record is only written once the append is awaited"]
pub struct PendingAppend {
    key: RecordKey,
    write: BoxFuture<'static, Result<()>>,
}

impl PendingAppend {
    pub fn new(key: RecordKey, write: BoxFuture<'static, Result<()>>) -> Self {
        Self { key, write }
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// Wait for the write and hand back the key.
    pub async fn durable(self) -> Result<RecordKey> {
        self.write.await?;
        Ok(self.key)
    }
}

/// Live subscription handle. Dropping it unsubscribes.
pub struct Subscription {
    path: StorePath,
    receiver: mpsc::UnboundedReceiver<RawTree>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(
        path: StorePath,
        receiver: mpsc::UnboundedReceiver<RawTree>,
        release: Box<dyn FnOnce() + Send + Sync>,
    ) -> Self {
        Self {
            path,
            receiver,
            release: Some(release),
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Wait for the next snapshot. `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<RawTree> {
        self.receiver.recv().await
    }

    /// Drain everything already queued and keep only the newest snapshot.
    pub fn latest(&mut self) -> Option<RawTree> {
        let mut newest = None;
        while let Ok(tree) = self.receiver.try_recv() {
            newest = Some(tree);
        }
        newest
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl Stream for Subscription {
    type Item = RawTree;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("active", &self.release.is_some())
            .finish()
    }
}
