//! Admin editors for the site's content.

pub mod collection;
pub mod contacts;
pub mod footer;
pub mod schema;

pub use crate::notify::{ActivityEntry, ActivityLog};
pub use collection::CollectionEditor;
pub use contacts::{CONTACTS_PATH, ContactMessage, ContactsInbox};
pub use footer::{DEFAULT_FOOTER_TEXT, FOOTER_PATH, FooterContent, FooterEditor, FooterLink, FooterList, SocialLink};
pub use schema::{ChangeAction, ContentKind, FieldRule};

/// Display toggle; has no effect on stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Editing,
    Previewing,
}

impl EditorMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Editing => Self::Previewing,
            Self::Previewing => Self::Editing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// A write is in flight or its echo has not been applied yet
    Syncing,
    Synced,
}
