//! Administrator sessions.
//!
//! The credential backend is a collaborator behind [`CredentialService`];
//! components get the current principal from an explicit [`SessionContext`]
//! rather than from global state.

pub mod memory;
pub mod session;

pub use memory::InMemoryCredentials;
pub use session::SessionContext;

use crate::core::Result;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::watch;

/// An authenticated administrator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    identifier: String,
}

impl Principal {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The backend has not reported a session yet
    Loading,
    SignedOut,
    SignedIn(Principal),
}

impl SessionState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::SignedIn(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Principal>;

    async fn sign_out(&self) -> Result<()>;

    /// Ask for a password reset. Must not reveal whether the account exists.
    async fn request_reset(&self, identifier: &str) -> Result<()>;

    /// Current session, starting at [`SessionState::Loading`] until the backend resolves it.
    fn session(&self) -> watch::Receiver<SessionState>;
}
