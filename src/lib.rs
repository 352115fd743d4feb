// ============================================================================
// Rustfolio Library
// ============================================================================

pub mod auth;
pub mod collection;
pub mod config;
pub mod core;
pub mod editor;
pub mod notify;
pub mod site;
pub mod storage;

// Re-export main types for convenience
pub use core::{CmsError, RecordKey, Result, StorePath};
pub use config::{CmsConfig, TelegramConfig};

// Store API
pub use storage::{
    InMemoryStore, KeyedRecordStore, PendingAppend, RawTree, SharedStore, SnapshotFile,
    Subscription,
};

// Ordered collections
pub use collection::{
    OrderedCollectionView, OrderedRecord, OrderingDomain, ReorderCoordinator, ReorderOutcome,
    compute_reorder,
};

// Editors, forms and their collaborators
pub use auth::{CredentialService, InMemoryCredentials, Principal, SessionContext, SessionState};
pub use editor::{
    ActivityLog, CollectionEditor, ContactsInbox, ContentKind, EditorMode, FooterEditor,
    SyncState,
};
pub use notify::{ChangeNotifier, NotificationSink, TelegramSink};
pub use site::{ContactForm, ContactSubmission, ReviewForm, ReviewSubmission};
