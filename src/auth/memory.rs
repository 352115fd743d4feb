use super::{CredentialService, Principal, SessionState};
use crate::core::{CmsError, Result, is_email};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{RwLock, watch};

/// Credential backend holding bcrypt-hashed accounts in memory.
pub struct InMemoryCredentials {
    accounts: RwLock<HashMap<String, String>>,
    state: watch::Sender<SessionState>,
    resets: Mutex<Vec<String>>,
    cost: u32,
}

impl InMemoryCredentials {
    /// Empty backend in the `Loading` state; call [`restore_session`](Self::restore_session)
    /// to resolve it.
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    /// Use a specific bcrypt cost (4..=31). Low costs are for tests only.
    pub fn with_cost(cost: u32) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            accounts: RwLock::new(HashMap::new()),
            state,
            resets: Mutex::new(Vec::new()),
            cost,
        }
    }

    pub async fn add_account(&self, identifier: &str, secret: &str) -> Result<()> {
        let identifier = normalize(identifier);
        if !is_email(&identifier) {
            return Err(CmsError::Validation(format!("'{}' is not a valid email", identifier)));
        }
        if secret.len() < 6 {
            return Err(CmsError::Validation("password must be at least 6 characters".into()));
        }
        let hash = bcrypt::hash(secret, self.cost)
            .map_err(|e| CmsError::Validation(format!("cannot hash password: {}", e)))?;
        self.accounts.write().await.insert(identifier, hash);
        Ok(())
    }

    /// Resolve the initial session: signed in as `identifier` if that account
    /// exists, signed out otherwise.
    pub async fn restore_session(&self, identifier: Option<&str>) {
        let restored = match identifier.map(normalize) {
            Some(id) if self.accounts.read().await.contains_key(&id) => {
                SessionState::SignedIn(Principal::new(id))
            }
            _ => SessionState::SignedOut,
        };
        self.state.send_replace(restored);
    }

    /// Resolve the session to `identifier` without a password check.
    /// For operator tooling that already runs with the site's authority.
    pub fn assume(&self, identifier: &str) -> Principal {
        let principal = Principal::new(normalize(identifier));
        self.state.send_replace(SessionState::SignedIn(principal.clone()));
        principal
    }

    /// Identifiers for which a reset was actually issued.
    pub fn reset_requests(&self) -> Vec<String> {
        self.resets.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for InMemoryCredentials {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

#[async_trait]
impl CredentialService for InMemoryCredentials {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Principal> {
        let identifier = normalize(identifier);
        let accounts = self.accounts.read().await;
        let hash = accounts.get(&identifier).ok_or(CmsError::InvalidCredentials)?;

        if !bcrypt::verify(secret, hash).unwrap_or(false) {
            return Err(CmsError::InvalidCredentials);
        }

        let principal = Principal::new(identifier);
        self.state.send_replace(SessionState::SignedIn(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<()> {
        self.state.send_replace(SessionState::SignedOut);
        Ok(())
    }

    async fn request_reset(&self, identifier: &str) -> Result<()> {
        let identifier = normalize(identifier);
        if !is_email(&identifier) {
            return Err(CmsError::Validation("enter a valid email address".into()));
        }
        if self.accounts.read().await.contains_key(&identifier) {
            self.resets.lock()?.push(identifier);
        }
        Ok(())
    }

    fn session(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend() -> InMemoryCredentials {
        let creds = InMemoryCredentials::with_cost(4);
        creds.add_account("Admin@Studio.test", "hunter22").await.unwrap();
        creds
    }

    #[tokio::test]
    async fn starts_loading_until_restored() {
        let creds = backend().await;
        assert!(creds.session().borrow().is_loading());
        creds.restore_session(None).await;
        assert_eq!(*creds.session().borrow(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn sign_in_is_case_insensitive_on_identifier() {
        let creds = backend().await;
        let principal = creds.sign_in(" admin@studio.test ", "hunter22").await.unwrap();
        assert_eq!(principal.identifier(), "admin@studio.test");
        assert_eq!(creds.session().borrow().principal(), Some(&principal));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_account_look_the_same() {
        let creds = backend().await;
        let wrong = creds.sign_in("admin@studio.test", "nope").await.unwrap_err();
        let unknown = creds.sign_in("ghost@studio.test", "hunter22").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn reset_does_not_reveal_accounts() {
        let creds = backend().await;
        creds.request_reset("admin@studio.test").await.unwrap();
        creds.request_reset("ghost@studio.test").await.unwrap();
        assert_eq!(creds.reset_requests(), vec!["admin@studio.test".to_string()]);
        assert!(creds.request_reset("not-an-email").await.is_err());
    }

    #[tokio::test]
    async fn restore_known_account_signs_in() {
        let creds = backend().await;
        creds.restore_session(Some("admin@studio.test")).await;
        assert!(creds.session().borrow().principal().is_some());
    }
}
