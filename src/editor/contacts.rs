use crate::auth::SessionContext;
use crate::collection::{OrderedCollectionView, OrderedRecord, OrderingDomain, SortKey};
use crate::core::{CmsError, RecordKey, Result};
use crate::storage::SharedStore;
use serde::Serialize;

pub const CONTACTS_PATH: &str = "contacts";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactMessage {
    pub key: RecordKey,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub description: String,
    pub timestamp: Option<i64>,
}

impl From<&OrderedRecord> for ContactMessage {
    fn from(record: &OrderedRecord) -> Self {
        let text = |field: &str| record.text(field).unwrap_or_default().to_string();
        Self {
            key: record.key.clone(),
            name: text("name"),
            email: text("email"),
            phone: text("phone"),
            description: text("description"),
            timestamp: record.timestamp,
        }
    }
}

/// Contact submissions, newest first.
pub struct ContactsInbox {
    store: SharedStore,
    view: OrderedCollectionView,
}

impl ContactsInbox {
    pub fn domain() -> Result<OrderingDomain> {
        Ok(OrderingDomain::parse(CONTACTS_PATH)?.sorted_by(SortKey::TimestampDesc))
    }

    pub async fn open(store: SharedStore, session: &SessionContext) -> Result<Self> {
        session.require_principal()?;
        let view = OrderedCollectionView::open(store.as_ref(), Self::domain()?).await?;
        Ok(Self { store, view })
    }

    pub fn messages(&self) -> Vec<ContactMessage> {
        self.view.records().iter().map(ContactMessage::from).collect()
    }

    pub fn refresh(&mut self) -> bool {
        self.view.sync()
    }

    pub async fn wait_for_change(&mut self) -> Result<()> {
        self.view.changed().await
    }

    /// Remove a submission once `confirm` accepts the prompt.
    pub async fn delete<F>(&mut self, key: &RecordKey, confirm: F) -> Result<bool>
    where
        F: FnOnce(&str) -> bool,
    {
        if self.view.get(key).is_none() {
            return Err(CmsError::RecordNotFound(key.to_string()));
        }
        if !confirm("Are you sure you want to delete this contact submission?") {
            return Ok(false);
        }
        let path = self.view.domain().record_path(key)?;
        self.store
            .delete_record(&path)
            .await
            .map_err(CmsError::into_store_write)?;
        Ok(true)
    }

    pub fn close(self) {
        self.view.close();
    }
}
