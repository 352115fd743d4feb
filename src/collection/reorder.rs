//! Move-and-renumber for one ordering domain.

use super::domain::OrderingDomain;
use super::record::OrderedRecord;
use super::view::OrderedCollectionView;
use crate::core::{CmsError, RecordKey, Result, StorePath};
use crate::notify::ChangeNotifier;
use crate::storage::SharedStore;
use futures::future::join_all;
use serde_json::Value;
use tracing::{Instrument, Level, event, info_span};

/// Move the element at `source` to `destination` and renumber every element
/// with its new position.
///
/// Returns `None` when the gesture was cancelled (`destination` is `None`)
/// or either index is out of bounds.
pub fn compute_reorder(
    sequence: &[OrderedRecord],
    source: usize,
    destination: Option<usize>,
) -> Option<Vec<OrderedRecord>> {
    let destination = destination?;
    if source >= sequence.len() || destination >= sequence.len() {
        return None;
    }

    let mut items = sequence.to_vec();
    let moved = items.remove(source);
    items.insert(destination, moved);

    Some(
        items
            .into_iter()
            .enumerate()
            .map(|(position, record)| record.with_order(position as i64))
            .collect(),
    )
}

/// A single `order` field write.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWrite {
    pub key: RecordKey,
    pub path: StorePath,
    pub order: i64,
}

/// Renumbered sequence plus the writes needed to persist it.
#[derive(Debug, Clone)]
pub struct ReorderPlan {
    pub sequence: Vec<OrderedRecord>,
    pub writes: Vec<OrderWrite>,
}

impl ReorderPlan {
    /// Plan a move of the `displayed` sequence within `domain`.
    ///
    /// Writes are diffed against `confirmed`, the store's last known state, so
    /// ranks left behind by a failed reorder still get rewritten. Keys the store
    /// no longer holds get no write.
    pub fn build(
        domain: &OrderingDomain,
        displayed: &[OrderedRecord],
        confirmed: &[OrderedRecord],
        source: usize,
        destination: Option<usize>,
    ) -> Result<Option<Self>> {
        let Some(sequence) = compute_reorder(displayed, source, destination) else {
            return Ok(None);
        };

        let mut writes = Vec::new();
        for record in &sequence {
            let Some(order) = record.order else { continue };
            let Some(stored) = confirmed.iter().find(|r| r.key == record.key) else {
                continue;
            };
            if stored.order != Some(order) {
                writes.push(OrderWrite {
                    key: record.key.clone(),
                    path: domain.order_path(&record.key)?,
                    order,
                });
            }
        }
        Ok(Some(Self { sequence, writes }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// No destination: nothing written, nothing shown
    Cancelled,
    /// Dropped where it started
    Unchanged,
    Applied { writes: usize },
}

/// Applies reorder gestures: optimistic display first, then order writes,
/// then one change notification.
#[derive(Clone)]
pub struct ReorderCoordinator {
    store: SharedStore,
    notifier: ChangeNotifier,
}

impl ReorderCoordinator {
    pub fn new(store: SharedStore, notifier: ChangeNotifier) -> Self {
        Self { store, notifier }
    }

    /// Reorder the records currently shown by `view`.
    ///
    /// Write failures are not retried. They come back as
    /// [`CmsError::ReorderFailed`] and the optimistic order stays on screen
    /// until the store's next notification replaces it; callers wanting the
    /// authoritative order immediately should resubscribe the view.
    pub async fn reorder(
        &self,
        view: &mut OrderedCollectionView,
        source: usize,
        destination: Option<usize>,
        section: &str,
        action: &str,
    ) -> Result<ReorderOutcome> {
        let len = view.len();
        if source >= len {
            return Err(CmsError::InvalidIndex { index: source, len });
        }
        let Some(target) = destination else {
            return Ok(ReorderOutcome::Cancelled);
        };
        if target >= len {
            return Err(CmsError::InvalidIndex { index: target, len });
        }
        if target == source {
            return Ok(ReorderOutcome::Unchanged);
        }

        let Some(plan) = ReorderPlan::build(
            view.domain(),
            view.records(),
            view.confirmed(),
            source,
            destination,
        )?
        else {
            return Ok(ReorderOutcome::Cancelled);
        };

        let span = info_span!("reorder", domain = %view.domain().label(), source, destination = target);
        let ReorderPlan { sequence, writes } = plan;
        view.set_optimistic(sequence);

        let total = writes.len();
        let results = join_all(writes.iter().map(|write| {
            let store = self.store.clone();
            async move {
                store
                    .write_field(&write.path, Value::from(write.order))
                    .await
            }
        }))
        .instrument(span.clone())
        .await;

        let failures: Vec<CmsError> = results.into_iter().filter_map(|r| r.err()).collect();
        if let Some(first) = failures.first() {
            span.in_scope(|| {
                event!(Level::WARN, failed = failures.len(), total, "order writes rejected");
            });
            return Err(CmsError::ReorderFailed {
                failed: failures.len(),
                total,
                reason: first.to_string(),
            });
        }

        span.in_scope(|| event!(Level::INFO, writes = total, "reorder persisted"));
        self.notifier.content_changed(section, action);
        Ok(ReorderOutcome::Applied { writes: total })
    }
}
