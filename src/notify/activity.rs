use crate::collection::{OrderingDomain, SortKey, derive_records};
use crate::core::{Fields, RecordKey, Result, SharedClock, StorePath};
use crate::storage::SharedStore;
use serde::Serialize;
use serde_json::Value;

pub const ACTIVITY_PATH: &str = "activityLogs";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub key: RecordKey,
    pub section: String,
    pub action: String,
    pub timestamp: Option<i64>,
}

/// Append-only log of admin changes, read back newest first.
#[derive(Clone)]
pub struct ActivityLog {
    store: SharedStore,
    clock: SharedClock,
    path: StorePath,
}

impl ActivityLog {
    pub fn new(store: SharedStore, clock: SharedClock) -> Result<Self> {
        Ok(Self {
            store,
            clock,
            path: StorePath::parse(ACTIVITY_PATH)?,
        })
    }

    pub fn domain(&self) -> OrderingDomain {
        OrderingDomain::new(self.path.clone()).sorted_by(SortKey::TimestampDesc)
    }

    pub async fn record(&self, section: &str, action: &str) -> Result<RecordKey> {
        let mut fields = Fields::new();
        fields.insert("section".into(), Value::from(section));
        fields.insert("action".into(), Value::from(action));
        fields.insert("timestamp".into(), Value::from(self.clock.now_millis()));
        self.store.append_record(&self.path, fields)?.durable().await
    }

    pub async fn entries(&self) -> Result<Vec<ActivityEntry>> {
        let tree = self.store.read_tree(&self.path).await?;
        Ok(derive_records(&tree, &self.domain())
            .into_iter()
            .map(|record| ActivityEntry {
                section: record.text("section").unwrap_or_default().to_string(),
                action: record.text("action").unwrap_or_default().to_string(),
                timestamp: record.timestamp,
                key: record.key,
            })
            .collect())
    }
}
