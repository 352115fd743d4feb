use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Failed to save changes. Please try again. ({0})")]
    StoreWrite(String),

    #[error("Failed to sign in. Please check your credentials.")]
    InvalidCredentials,

    #[error("Subscription to '{0}' closed")]
    SubscriptionClosed(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Index {index} is out of bounds for a list of {len} records")]
    InvalidIndex { index: usize, len: usize },

    #[error("Reorder failed: {failed} of {total} order writes were rejected ({reason})")]
    ReorderFailed {
        failed: usize,
        total: usize,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{message}")]
    Cooldown { message: String, retry_after_secs: u64 },

    #[error("Deleting '{0}' requires explicit confirmation")]
    ConfirmationRequired(String),

    #[error("Record '{0}' not found")]
    RecordNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, CmsError>;

impl CmsError {
    /// Report a failed data-path write as the generic save failure.
    pub fn into_store_write(self) -> Self {
        match self {
            Self::StoreWrite(_) => self,
            other => Self::StoreWrite(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CmsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CmsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CmsError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
