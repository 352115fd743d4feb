/// Snapshot persistence tests
///
/// Saving the store to disk and starting again from the file
/// Run with: cargo test --test snapshot_persistence_tests

use rustfolio::{
    ChangeNotifier, CollectionEditor, ContentKind, InMemoryCredentials, InMemoryStore,
    KeyedRecordStore, SessionContext, SnapshotFile, StorePath,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn session() -> SessionContext {
    let credentials = Arc::new(InMemoryCredentials::with_cost(4));
    credentials.assume("admin@studio.test");
    SessionContext::new(credentials, ChangeNotifier::disabled())
}

#[tokio::test]
async fn test_missing_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();
    let file = SnapshotFile::new(dir.path().join("site.json"));
    let store = InMemoryStore::open_snapshot(&file).await.unwrap();
    assert!(store.read_tree(&StorePath::parse("features").unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_edits_survive_restart() {
    let dir = TempDir::new().unwrap();
    let file = SnapshotFile::new(dir.path().join("site.json"));

    let store = InMemoryStore::new();
    let mut editor = CollectionEditor::open(
        ContentKind::Service,
        Arc::new(store.clone()),
        &session(),
        ChangeNotifier::disabled(),
    )
    .await
    .unwrap();
    let first = editor.add().await.unwrap();
    let second = editor.add().await.unwrap();
    editor.refresh();
    editor.reorder(1, Some(0)).await.unwrap();
    editor.close();
    store.save_snapshot(&file).await.unwrap();
    assert!(file.exists());

    let restored = InMemoryStore::open_snapshot(&file).await.unwrap();
    let editor = CollectionEditor::open(
        ContentKind::Service,
        Arc::new(restored),
        &session(),
        ChangeNotifier::disabled(),
    )
    .await
    .unwrap();
    let keys: Vec<_> = editor.records().iter().map(|r| r.key.clone()).collect();
    assert_eq!(keys, vec![second, first]);
    assert_eq!(editor.records()[0].field("whatsappLink"), Some(&json!("https://wa.me/")));
}
