use super::schema::{ChangeAction, ContentKind};
use super::{EditorMode, SyncState};
use crate::auth::{Principal, SessionContext};
use crate::collection::{
    ORDER_FIELD, OrderedCollectionView, OrderedRecord, ReorderCoordinator, ReorderOutcome,
};
use crate::core::{CmsError, RecordKey, Result};
use crate::notify::ChangeNotifier;
use crate::storage::SharedStore;
use serde_json::Value;
use tracing::{Instrument, Level, event, info_span};

/// Admin editor bound to one ordering domain.
///
/// Wraps a live view of the domain with the add, update, delete and reorder
/// actions of its content kind. Store echoes are applied by [`refresh`](Self::refresh)
/// or [`wait_for_change`](Self::wait_for_change).
pub struct CollectionEditor {
    kind: ContentKind,
    store: SharedStore,
    view: OrderedCollectionView,
    coordinator: ReorderCoordinator,
    notifier: ChangeNotifier,
    principal: Principal,
    mode: EditorMode,
    /// View revision at the time of the last write still waiting for its echo
    awaiting_echo: Option<u64>,
}

impl CollectionEditor {
    /// Open an editor for `kind`. Requires a signed-in administrator.
    pub async fn open(
        kind: ContentKind,
        store: SharedStore,
        session: &SessionContext,
        notifier: ChangeNotifier,
    ) -> Result<Self> {
        let principal = session.require_principal()?;
        let view = OrderedCollectionView::open(store.as_ref(), kind.domain()?).await?;
        log::debug!("{} opened editor for {}", principal, view.domain().label());
        Ok(Self {
            kind,
            coordinator: ReorderCoordinator::new(store.clone(), notifier.clone()),
            store,
            view,
            notifier,
            principal,
            mode: EditorMode::Editing,
            awaiting_echo: None,
        })
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn view(&self) -> &OrderedCollectionView {
        &self.view
    }

    pub fn records(&self) -> &[OrderedRecord] {
        self.view.records()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&OrderedRecord> {
        self.view.get(key)
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    pub fn toggle_preview(&mut self) -> EditorMode {
        self.mode = self.mode.toggled();
        self.mode
    }

    /// `Syncing` while a write's echo is outstanding or an optimistic order is shown.
    pub fn sync_state(&self) -> SyncState {
        let awaiting = self
            .awaiting_echo
            .is_some_and(|revision| self.view.revision() <= revision);
        if awaiting || self.view.has_optimistic() {
            SyncState::Syncing
        } else {
            SyncState::Synced
        }
    }

    /// Apply store notifications that have already arrived.
    pub fn refresh(&mut self) -> bool {
        let changed = self.view.sync();
        self.settle();
        changed
    }

    /// Wait for the next store notification.
    pub async fn wait_for_change(&mut self) -> Result<()> {
        self.view.changed().await?;
        self.settle();
        Ok(())
    }

    /// Rebuild the view from the store's authoritative state.
    pub async fn resync(&mut self) -> Result<()> {
        self.view.resubscribe(self.store.as_ref()).await?;
        self.awaiting_echo = None;
        Ok(())
    }

    fn settle(&mut self) {
        if self
            .awaiting_echo
            .is_some_and(|revision| self.view.revision() > revision)
        {
            self.awaiting_echo = None;
        }
    }

    fn mark_pending(&mut self) {
        self.awaiting_echo = Some(self.view.revision());
    }

    /// Append a record with the kind's defaults, ranked after every current record.
    pub async fn add(&mut self) -> Result<RecordKey> {
        let mut fields = self.kind.add_defaults().ok_or_else(|| {
            CmsError::Validation(format!("{} cannot be added from the editor", self.kind))
        })?;
        self.refresh();
        let order = self.view.len() as i64;
        fields.insert(ORDER_FIELD.to_string(), Value::from(order));

        let span = info_span!("editor_add", domain = %self.view.domain().label(), order);
        let pending = self
            .store
            .append_record(self.view.domain().path(), fields)
            .map_err(CmsError::into_store_write)?;
        self.mark_pending();
        let key = pending
            .durable()
            .instrument(span.clone())
            .await
            .map_err(CmsError::into_store_write)?;

        span.in_scope(|| event!(Level::INFO, key = %key, "record added"));
        self.notifier
            .content_changed(self.kind.section(), &self.kind.action_label(ChangeAction::Added));
        Ok(key)
    }

    /// Write one editable field after applying its input rule.
    pub async fn update_field(&mut self, key: &RecordKey, field: &str, value: Value) -> Result<()> {
        let rule = self.kind.field_rule(field).ok_or_else(|| {
            CmsError::Validation(format!("'{}' is not an editable field of {}", field, self.kind))
        })?;
        self.refresh();
        self.require_record(key)?;
        let value = rule.apply(field, value)?;
        let path = self.view.domain().field_path(key, field)?;

        self.store
            .write_field(&path, value)
            .await
            .map_err(CmsError::into_store_write)?;
        self.mark_pending();
        event!(Level::DEBUG, path = %path, "field updated");
        Ok(())
    }

    /// Delete a record once `confirm` accepts the prompt. Siblings keep their ranks.
    ///
    /// Returns `false` when the confirmation was declined.
    pub async fn delete<F>(&mut self, key: &RecordKey, confirm: F) -> Result<bool>
    where
        F: FnOnce(&str) -> bool,
    {
        self.refresh();
        self.require_record(key)?;
        if !confirm(&self.kind.delete_prompt()) {
            return Ok(false);
        }
        let path = self.view.domain().record_path(key)?;
        self.store
            .delete_record(&path)
            .await
            .map_err(CmsError::into_store_write)?;
        self.mark_pending();
        event!(Level::INFO, path = %path, "record deleted");
        self.notifier
            .content_changed(self.kind.section(), &self.kind.action_label(ChangeAction::Deleted));
        Ok(true)
    }

    /// Move the record shown at `source` to `destination`.
    ///
    /// Store notifications that already arrived are applied first, so the
    /// indices refer to the list as it stands after earlier writes.
    pub async fn reorder(
        &mut self,
        source: usize,
        destination: Option<usize>,
    ) -> Result<ReorderOutcome> {
        self.refresh();
        let action = self.kind.action_label(ChangeAction::Reordered);
        let outcome = self
            .coordinator
            .reorder(&mut self.view, source, destination, self.kind.section(), &action)
            .await?;
        if matches!(outcome, ReorderOutcome::Applied { .. }) {
            self.mark_pending();
        }
        Ok(outcome)
    }

    /// What the public page shows for this kind.
    pub fn preview(&self) -> &[OrderedRecord] {
        let records = self.view.records();
        match self.kind.preview_limit() {
            Some(limit) => &records[..records.len().min(limit)],
            None => records,
        }
    }

    pub fn close(self) {
        self.view.close();
    }

    fn require_record(&self, key: &RecordKey) -> Result<()> {
        if self.view.get(key).is_none() {
            return Err(CmsError::RecordNotFound(key.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryCredentials;
    use crate::notify::ActivityLog;
    use crate::notify::testing::RecordingSink;
    use crate::storage::testing::FlakyStore;
    use crate::storage::{InMemoryStore, KeyedRecordStore};
    use serde_json::json;
    use std::sync::Arc;

    async fn signed_in() -> SessionContext {
        let creds = Arc::new(InMemoryCredentials::with_cost(4));
        creds.add_account("admin@studio.test", "hunter22").await.unwrap();
        creds.restore_session(Some("admin@studio.test")).await;
        SessionContext::new(creds, ChangeNotifier::disabled())
    }

    fn features() -> InMemoryStore {
        InMemoryStore::from_tree(json!({"features": {
            "k0": {"name": "A", "description": "a", "order": 0},
            "k1": {"name": "B", "description": "b", "order": 1},
            "k2": {"name": "C", "description": "c", "order": 2},
        }}))
    }

    fn names(editor: &CollectionEditor) -> Vec<String> {
        editor
            .records()
            .iter()
            .map(|r| format!("{}{}", r.text("name").unwrap_or("?"), r.order.unwrap_or(-1)))
            .collect()
    }

    fn key(raw: &str) -> RecordKey {
        RecordKey::new(raw).unwrap()
    }

    #[tokio::test]
    async fn open_requires_a_principal() {
        let creds = Arc::new(InMemoryCredentials::with_cost(4));
        creds.restore_session(None).await;
        let session = SessionContext::new(creds, ChangeNotifier::disabled());
        let result = CollectionEditor::open(
            ContentKind::Feature,
            Arc::new(features()),
            &session,
            ChangeNotifier::disabled(),
        )
        .await;
        assert!(matches!(result, Err(CmsError::Unauthenticated)));
    }

    #[tokio::test]
    async fn add_ranks_after_current_records_and_alerts() {
        let sink = Arc::new(RecordingSink::default());
        let store = features();
        let mut editor = CollectionEditor::open(
            ContentKind::Feature,
            Arc::new(store.clone()),
            &signed_in().await,
            ChangeNotifier::new(sink.clone()),
        )
        .await
        .unwrap();

        let added = editor.add().await.unwrap();
        assert_eq!(editor.sync_state(), SyncState::Syncing);
        assert!(editor.refresh());
        assert_eq!(editor.sync_state(), SyncState::Synced);
        assert_eq!(names(&editor), vec!["A0", "B1", "C2", "New Feature3"]);
        assert_eq!(editor.records()[3].key, added);

        for _ in 0..50 {
            if !sink.messages().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(sink.messages()[0].contains("Added new feature"));
    }

    #[tokio::test]
    async fn reviews_cannot_be_added_by_admins() {
        let mut editor = CollectionEditor::open(
            ContentKind::Review,
            Arc::new(InMemoryStore::new()),
            &signed_in().await,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();
        assert!(matches!(editor.add().await, Err(CmsError::Validation(_))));
    }

    #[tokio::test]
    async fn update_field_applies_rules() {
        let store = InMemoryStore::from_tree(json!({"reviews": {
            "r1": {"username": "ana", "rating": 4, "description": "ok", "order": 0},
        }}));
        let mut editor = CollectionEditor::open(
            ContentKind::Review,
            Arc::new(store.clone()),
            &signed_in().await,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();

        editor.update_field(&key("r1"), "rating", json!(11)).await.unwrap();
        editor.refresh();
        assert_eq!(editor.get(&key("r1")).unwrap().field("rating"), Some(&json!(5)));

        let err = editor.update_field(&key("r1"), "order", json!(3)).await.unwrap_err();
        assert!(matches!(err, CmsError::Validation(_)));
        let err = editor.update_field(&key("nope"), "rating", json!(3)).await.unwrap_err();
        assert!(matches!(err, CmsError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn delete_needs_confirmation_and_leaves_a_gap() {
        let store = features();
        let mut editor = CollectionEditor::open(
            ContentKind::Feature,
            Arc::new(store.clone()),
            &signed_in().await,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();

        let mut prompt = String::new();
        let deleted = editor
            .delete(&key("k1"), |text| {
                prompt = text.to_string();
                false
            })
            .await
            .unwrap();
        assert!(!deleted);
        assert_eq!(prompt, "Are you sure you want to delete this feature?");
        assert_eq!(editor.records().len(), 3);

        assert!(editor.delete(&key("k1"), |_| true).await.unwrap());
        editor.refresh();
        assert_eq!(names(&editor), vec!["A0", "C2"]);
    }

    #[tokio::test]
    async fn reorder_moves_and_renumbers() {
        let store = features();
        let mut editor = CollectionEditor::open(
            ContentKind::Feature,
            Arc::new(store.clone()),
            &signed_in().await,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();

        let outcome = editor.reorder(0, Some(2)).await.unwrap();
        assert_eq!(outcome, ReorderOutcome::Applied { writes: 3 });
        assert_eq!(names(&editor), vec!["B0", "C1", "A2"]);
        assert_eq!(editor.sync_state(), SyncState::Syncing);

        editor.refresh();
        assert_eq!(editor.sync_state(), SyncState::Synced);
        assert_eq!(names(&editor), vec!["B0", "C1", "A2"]);
        assert_eq!(editor.reorder(1, None).await.unwrap(), ReorderOutcome::Cancelled);
    }

    #[tokio::test]
    async fn failed_reorder_keeps_optimistic_order_until_resync() {
        let flaky = Arc::new(FlakyStore::new(features()));
        let mut editor = CollectionEditor::open(
            ContentKind::Feature,
            flaky.clone(),
            &signed_in().await,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();

        flaky.fail_writes(true);
        let err = editor.reorder(0, Some(2)).await.unwrap_err();
        assert!(matches!(err, CmsError::ReorderFailed { failed: 3, total: 3, .. }));
        assert_eq!(names(&editor), vec!["B0", "C1", "A2"]);

        editor.resync().await.unwrap();
        assert_eq!(names(&editor), vec!["A0", "B1", "C2"]);
    }

    #[tokio::test]
    async fn portfolio_partitions_do_not_touch_each_other() {
        let store = InMemoryStore::from_tree(json!({"portfolio": {
            "g0": {"title": "G0", "type": "graphic", "order": 0},
            "g1": {"title": "G1", "type": "graphic", "order": 1},
            "v0": {"title": "V0", "type": "video", "order": 0},
            "v1": {"title": "V1", "type": "video", "order": 1},
        }}));
        let session = signed_in().await;
        let mut graphics = CollectionEditor::open(
            ContentKind::PortfolioGraphic,
            Arc::new(store.clone()),
            &session,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();

        graphics.reorder(1, Some(0)).await.unwrap();
        let added = graphics.add().await.unwrap();
        graphics.refresh();
        assert_eq!(graphics.get(&added).unwrap().order, Some(2));

        let videos = CollectionEditor::open(
            ContentKind::PortfolioVideo,
            Arc::new(store.clone()),
            &session,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();
        let ranks: Vec<(String, Option<i64>)> = videos
            .records()
            .iter()
            .map(|r| (r.key.to_string(), r.order))
            .collect();
        assert_eq!(
            ranks,
            vec![("v0".to_string(), Some(0)), ("v1".to_string(), Some(1))]
        );
    }

    #[tokio::test]
    async fn preview_toggle_and_limit() {
        let store = InMemoryStore::from_tree(json!({"features": {
            "k0": {"name": "A", "order": 0},
            "k1": {"name": "B", "order": 1},
            "k2": {"name": "C", "order": 2},
            "k3": {"name": "D", "order": 3},
        }}));
        let mut editor = CollectionEditor::open(
            ContentKind::Feature,
            Arc::new(store),
            &signed_in().await,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();
        assert_eq!(editor.toggle_preview(), EditorMode::Previewing);
        assert_eq!(editor.preview().len(), 3);
        assert_eq!(editor.toggle_preview(), EditorMode::Editing);
    }

    async fn stored(store: &InMemoryStore) -> Value {
        store
            .read_tree(&ContentKind::Feature.domain().unwrap().path().clone())
            .await
            .unwrap()
            .unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn reorder_after_failed_reorder_restores_contiguous_ranks() {
        let store = features();
        let flaky = Arc::new(FlakyStore::new(store.clone()));
        let mut editor = CollectionEditor::open(
            ContentKind::Feature,
            flaky.clone(),
            &signed_in().await,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();

        flaky.fail_writes(true);
        assert!(editor.reorder(0, Some(2)).await.is_err());
        assert_eq!(names(&editor), vec!["B0", "C1", "A2"]);

        flaky.fail_writes(false);
        let outcome = editor.reorder(1, Some(2)).await.unwrap();
        assert_eq!(outcome, ReorderOutcome::Applied { writes: 2 });
        assert_eq!(names(&editor), vec!["B0", "A1", "C2"]);

        editor.refresh();
        assert_eq!(names(&editor), vec!["B0", "A1", "C2"]);
        let tree = stored(&store).await;
        assert_eq!(tree["k0"]["order"], json!(1));
        assert_eq!(tree["k1"]["order"], json!(0));
        assert_eq!(tree["k2"]["order"], json!(2));
    }

    #[tokio::test]
    async fn reorder_right_after_delete_does_not_revive_the_record() {
        let store = features();
        let mut editor = CollectionEditor::open(
            ContentKind::Feature,
            Arc::new(store.clone()),
            &signed_in().await,
            ChangeNotifier::disabled(),
        )
        .await
        .unwrap();

        assert!(editor.delete(&key("k1"), |_| true).await.unwrap());
        let outcome = editor.reorder(1, Some(0)).await.unwrap();
        assert_eq!(outcome, ReorderOutcome::Applied { writes: 2 });

        let tree = stored(&store).await;
        assert!(tree.get("k1").is_none());
        assert_eq!(tree["k2"]["order"], json!(0));
        assert_eq!(tree["k0"]["order"], json!(1));
        editor.refresh();
        assert_eq!(names(&editor), vec!["C0", "A1"]);
    }

    #[tokio::test]
    async fn reorder_sends_one_alert_and_one_log_entry() {
        let sink = Arc::new(RecordingSink::default());
        let store = features();
        let log = ActivityLog::new(Arc::new(store.clone()), crate::core::system_clock()).unwrap();
        let notifier = ChangeNotifier::new(sink.clone()).with_activity_log(log.clone());
        let mut editor = CollectionEditor::open(
            ContentKind::Feature,
            Arc::new(store.clone()),
            &signed_in().await,
            notifier.clone(),
        )
        .await
        .unwrap();

        let outcome = editor.reorder(0, Some(2)).await.unwrap();
        assert_eq!(outcome, ReorderOutcome::Applied { writes: 3 });
        notifier.flush().await;

        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Reordered features"));
        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].section, "Features");
        assert_eq!(entries[0].action, "Reordered features");
    }
}
