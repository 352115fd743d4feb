use crate::core::{Fields, RecordKey, as_rank, text_field};
use serde::Serialize;
use serde_json::Value;

pub const ORDER_FIELD: &str = "order";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// One record of an ordering domain, flattened out of the keyed store shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedRecord {
    pub key: RecordKey,
    /// Display rank; `None` when the stored value is missing or not numeric
    pub order: Option<i64>,
    /// Creation time in milliseconds, present on public submissions
    pub timestamp: Option<i64>,
    /// Remaining type-specific attributes
    pub fields: Fields,
}

impl OrderedRecord {
    /// Lift a raw stored value into a record. Non-object values become a
    /// record without fields or rank rather than an error.
    pub fn from_raw(key: RecordKey, raw: &Value) -> Self {
        let mut fields = raw.as_object().cloned().unwrap_or_default();
        let order = fields.remove(ORDER_FIELD).as_ref().and_then(as_rank);
        let timestamp = fields.remove(TIMESTAMP_FIELD).as_ref().and_then(as_rank);
        Self {
            key,
            order,
            timestamp,
            fields,
        }
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        text_field(&self.fields, field)
    }

    pub fn field(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// The stored shape of this record, rank and timestamp included.
    pub fn to_fields(&self) -> Fields {
        let mut fields = self.fields.clone();
        if let Some(order) = self.order {
            fields.insert(ORDER_FIELD.to_string(), Value::from(order));
        }
        if let Some(timestamp) = self.timestamp {
            fields.insert(TIMESTAMP_FIELD.to_string(), Value::from(timestamp));
        }
        fields
    }
}
