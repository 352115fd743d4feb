//! Ordered collections: records, ordering domains, live views and the
//! reorder protocol shared by every content editor.

pub mod domain;
pub mod record;
pub mod reorder;
pub mod view;

pub use domain::{OrderingDomain, Partition, SortKey};
pub use record::{ORDER_FIELD, OrderedRecord, TIMESTAMP_FIELD};
pub use reorder::{OrderWrite, ReorderCoordinator, ReorderOutcome, ReorderPlan, compute_reorder};
pub use view::{OrderedCollectionView, derive_partitions, derive_records, sort_records};
