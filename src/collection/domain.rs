use super::record::{ORDER_FIELD, OrderedRecord};
use crate::core::{RecordKey, Result, StorePath};
use serde_json::Value;

/// How a domain's records are sorted for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Ascending `order`, absent last, ties in store iteration order
    Order,
    /// Newest `timestamp` first, absent last
    TimestampDesc,
}

/// Restricts a domain to records whose discriminant field has one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub field: String,
    pub value: String,
}

impl Partition {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &OrderedRecord) -> bool {
        record.field(&self.field).and_then(Value::as_str) == Some(self.value.as_str())
    }
}

/// A set of records sharing one rank space: a store path, optionally
/// narrowed to one partition of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingDomain {
    path: StorePath,
    partition: Option<Partition>,
    sort: SortKey,
}

impl OrderingDomain {
    pub fn new(path: StorePath) -> Self {
        Self {
            path,
            partition: None,
            sort: SortKey::Order,
        }
    }

    pub fn parse(path: &str) -> Result<Self> {
        Ok(Self::new(StorePath::parse(path)?))
    }

    pub fn partitioned(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.partition = Some(Partition::new(field, value));
        self
    }

    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn partition(&self) -> Option<&Partition> {
        self.partition.as_ref()
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn contains(&self, record: &OrderedRecord) -> bool {
        self.partition.as_ref().is_none_or(|p| p.matches(record))
    }

    pub fn record_path(&self, key: &RecordKey) -> Result<StorePath> {
        self.path.child(key.as_str())
    }

    pub fn field_path(&self, key: &RecordKey, field: &str) -> Result<StorePath> {
        self.path.field(key, field)
    }

    pub fn order_path(&self, key: &RecordKey) -> Result<StorePath> {
        self.field_path(key, ORDER_FIELD)
    }

    /// Short label for logs: `portfolio[type=video]`.
    pub fn label(&self) -> String {
        match &self.partition {
            Some(p) => format!("{}[{}={}]", self.path, p.field, p.value),
            None => self.path.to_string(),
        }
    }
}
