//! Keyed store snapshots turned into sorted record lists.

use super::domain::{OrderingDomain, SortKey};
use super::record::OrderedRecord;
use crate::core::{CmsError, RecordKey, Result, compare_ranks};
use crate::storage::{KeyedRecordStore, RawTree, Subscription};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Flatten a keyed snapshot into the domain's display order.
///
/// An absent or non-object tree is an empty list. Entries with keys the
/// store would not accept are skipped. The sort is stable, so records with
/// equal or missing ranks keep the store's iteration order.
pub fn derive_records(tree: &RawTree, domain: &OrderingDomain) -> Vec<OrderedRecord> {
    let mut records: Vec<OrderedRecord> = flatten(tree)
        .filter(|record| domain.contains(record))
        .collect();
    sort_records(&mut records, domain.sort());
    records
}

/// Split one snapshot into independently sorted partitions of `field`.
/// Records without a textual discriminant belong to no partition.
pub fn derive_partitions(tree: &RawTree, field: &str) -> BTreeMap<String, Vec<OrderedRecord>> {
    let mut partitions: BTreeMap<String, Vec<OrderedRecord>> = BTreeMap::new();
    for record in flatten(tree) {
        let Some(value) = record.field(field).and_then(Value::as_str) else {
            log::debug!("record '{}' has no '{}' discriminant", record.key, field);
            continue;
        };
        partitions.entry(value.to_string()).or_default().push(record);
    }
    for records in partitions.values_mut() {
        sort_records(records, SortKey::Order);
    }
    partitions
}

pub fn sort_records(records: &mut [OrderedRecord], sort: SortKey) {
    match sort {
        SortKey::Order => records.sort_by(|a, b| compare_ranks(a.order, b.order)),
        SortKey::TimestampDesc => records.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(a), Some(b)) => b.cmp(&a),
            (a, b) => compare_ranks(a, b),
        }),
    }
}

fn flatten(tree: &RawTree) -> impl Iterator<Item = OrderedRecord> + '_ {
    tree.as_ref()
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|map| map.iter())
        .filter_map(|(key, raw)| {
            RecordKey::new(key.as_str())
                .ok()
                .map(|key| OrderedRecord::from_raw(key, raw))
        })
}

/// Live, sorted view of one ordering domain.
///
/// Holds the last confirmed list from the store plus an optional optimistic
/// override. Any store notification replaces the confirmed list and drops
/// the override.
pub struct OrderedCollectionView {
    domain: OrderingDomain,
    subscription: Subscription,
    confirmed: Vec<OrderedRecord>,
    optimistic: Option<Vec<OrderedRecord>>,
    revision: u64,
}

impl OrderedCollectionView {
    /// Subscribe to the domain's path and wait for the initial snapshot.
    pub async fn open(store: &dyn KeyedRecordStore, domain: OrderingDomain) -> Result<Self> {
        let mut subscription = store.subscribe_tree(domain.path()).await?;
        let initial = subscription
            .next()
            .await
            .ok_or_else(|| CmsError::SubscriptionClosed(domain.path().to_string()))?;
        let mut view = Self {
            confirmed: Vec::new(),
            optimistic: None,
            revision: 0,
            domain,
            subscription,
        };
        view.apply_snapshot(initial);
        Ok(view)
    }

    pub fn domain(&self) -> &OrderingDomain {
        &self.domain
    }

    /// What should be displayed: the optimistic list if one is pending,
    /// the confirmed list otherwise.
    pub fn records(&self) -> &[OrderedRecord] {
        self.optimistic.as_deref().unwrap_or(&self.confirmed)
    }

    pub fn confirmed(&self) -> &[OrderedRecord] {
        &self.confirmed
    }

    pub fn has_optimistic(&self) -> bool {
        self.optimistic.is_some()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&OrderedRecord> {
        self.records().iter().find(|record| &record.key == key)
    }

    /// Number of store notifications applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn apply_snapshot(&mut self, tree: RawTree) {
        self.confirmed = derive_records(&tree, &self.domain);
        self.optimistic = None;
        self.revision += 1;
    }

    pub fn set_optimistic(&mut self, records: Vec<OrderedRecord>) {
        self.optimistic = Some(records);
    }

    /// Apply whatever notifications are already queued. Returns whether any were.
    pub fn sync(&mut self) -> bool {
        match self.subscription.latest() {
            Some(tree) => {
                self.apply_snapshot(tree);
                true
            }
            None => false,
        }
    }

    /// Wait for the next store notification and apply it.
    pub async fn changed(&mut self) -> Result<()> {
        let tree = self
            .subscription
            .next()
            .await
            .ok_or_else(|| CmsError::SubscriptionClosed(self.domain.path().to_string()))?;
        self.apply_snapshot(tree);
        self.sync();
        Ok(())
    }

    /// Drop the current subscription and rebuild from a fresh one.
    pub async fn resubscribe(&mut self, store: &dyn KeyedRecordStore) -> Result<()> {
        let fresh = Self::open(store, self.domain.clone()).await?;
        let revision = self.revision;
        *self = fresh;
        self.revision += revision;
        Ok(())
    }

    pub fn close(self) {
        self.subscription.unsubscribe();
    }
}
