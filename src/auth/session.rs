use super::{CredentialService, Principal, SessionState};
use crate::core::{CmsError, Result};
use crate::notify::{ChangeNotifier, message};
use chrono::Local;
use std::sync::Arc;
use tokio::sync::watch;

/// Session handle passed to every component that needs the signed-in admin.
#[derive(Clone)]
pub struct SessionContext {
    credentials: Arc<dyn CredentialService>,
    notifier: ChangeNotifier,
}

impl SessionContext {
    pub fn new(credentials: Arc<dyn CredentialService>, notifier: ChangeNotifier) -> Self {
        Self {
            credentials,
            notifier,
        }
    }

    /// Sign in and alert about the login. Every failure reads the same.
    pub async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Principal> {
        match self.credentials.sign_in(identifier, secret).await {
            Ok(principal) => {
                self.notifier
                    .notify(message::admin_login_alert(principal.identifier(), Local::now()));
                Ok(principal)
            }
            Err(err) => {
                log::debug!("sign-in rejected: {}", err);
                Err(CmsError::InvalidCredentials)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.credentials.sign_out().await
    }

    pub async fn request_reset(&self, identifier: &str) -> Result<()> {
        self.credentials.request_reset(identifier).await
    }

    pub fn state(&self) -> SessionState {
        self.credentials.session().borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.credentials.session()
    }

    /// Wait until the backend has reported a session.
    pub async fn resolved(&self) -> Result<SessionState> {
        let mut session = self.credentials.session();
        let state = session
            .wait_for(|state| !state.is_loading())
            .await
            .map_err(|_| CmsError::Unauthenticated)?;
        Ok(state.clone())
    }

    pub fn require_principal(&self) -> Result<Principal> {
        self.state()
            .principal()
            .cloned()
            .ok_or(CmsError::Unauthenticated)
    }
}
