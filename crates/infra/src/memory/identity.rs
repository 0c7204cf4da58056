use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Semaphore;
use uuid::Uuid;

use indica_auth::{AccessToken, IdentityProvider, PersistedToken, ProviderError, Session, SignUpRequest};
use indica_core::IdentityId;

#[derive(Debug, Clone)]
struct Account {
    id: IdentityId,
    password: String,
    name: String,
}

#[derive(Debug, Clone)]
struct Grant {
    id: IdentityId,
    email: String,
    expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    grants: HashMap<String, Grant>,
}

/// In-memory identity provider.
///
/// Cloning shares state, so a test can keep a handle to flip the provider offline or
/// inspect issued tokens while the session store owns another.
#[derive(Debug, Clone)]
pub struct InMemoryIdentityProvider {
    inner: Arc<RwLock<Inner>>,
    offline: Arc<AtomicBool>,
    validation_paused: Arc<AtomicBool>,
    validation_gate: Arc<Semaphore>,
    token_ttl: Duration,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::with_token_ttl(Duration::hours(1))
    }

    pub fn with_token_ttl(token_ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            offline: Arc::default(),
            validation_paused: Arc::default(),
            validation_gate: Arc::new(Semaphore::new(0)),
            token_ttl,
        }
    }

    /// Seed a verified account and return its identity.
    pub fn register(&self, email: &str, password: &str, name: &str) -> IdentityId {
        let id = IdentityId::new();
        self.write().accounts.insert(
            email.trim().to_lowercase(),
            Account {
                id,
                password: password.to_string(),
                name: name.to_string(),
            },
        );
        id
    }

    pub fn identity_of(&self, email: &str) -> Option<IdentityId> {
        self.read().accounts.get(&email.trim().to_lowercase()).map(|a| a.id)
    }

    pub fn display_name_of(&self, email: &str) -> Option<String> {
        self.read()
            .accounts
            .get(&email.trim().to_lowercase())
            .map(|a| a.name.clone())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Token validations started from now on wait for [`release_validations`](Self::release_validations).
    pub fn pause_validations(&self) {
        self.validation_paused.store(true, Ordering::SeqCst);
    }

    pub fn release_validations(&self, n: usize) {
        self.validation_gate.add_permits(n);
    }

    pub fn live_tokens(&self) -> usize {
        self.read().grants.len()
    }

    fn ensure_online(&self) -> Result<(), ProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderError::Network("identity provider offline".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        self.ensure_online()?;
        let email = email.trim().to_lowercase();

        let mut inner = self.write();
        let account = match inner.accounts.get(&email) {
            Some(account) if account.password == password => account.clone(),
            _ => return Err(ProviderError::InvalidCredentials),
        };

        let token = Uuid::now_v7().simple().to_string();
        let expires_at = Utc::now() + self.token_ttl;
        inner.grants.insert(
            token.clone(),
            Grant {
                id: account.id,
                email: email.clone(),
                expires_at,
            },
        );

        Ok(Session {
            identity_id: account.id,
            email,
            access_token: AccessToken::new(token),
            expires_at,
        })
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), ProviderError> {
        self.ensure_online()?;
        let email = request.email.trim().to_lowercase();

        let mut inner = self.write();
        if inner.accounts.contains_key(&email) {
            return Err(ProviderError::Rejected("user already registered".to_string()));
        }
        inner.accounts.insert(
            email,
            Account {
                id: IdentityId::new(),
                password: request.password.clone(),
                name: request.name.clone(),
            },
        );
        Ok(())
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), ProviderError> {
        self.ensure_online()?;
        self.write().grants.remove(token.expose());
        Ok(())
    }

    async fn validate(&self, token: &PersistedToken) -> Result<Session, ProviderError> {
        if self.validation_paused.load(Ordering::SeqCst) {
            self.validation_gate
                .acquire()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?
                .forget();
        }
        self.ensure_online()?;
        let inner = self.read();
        let grant = inner
            .grants
            .get(token.access_token.expose())
            .filter(|g| g.expires_at > Utc::now())
            .ok_or(ProviderError::InvalidToken)?;

        Ok(Session {
            identity_id: grant.id,
            email: grant.email.clone(),
            access_token: token.access_token.clone(),
            expires_at: grant.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_issues_a_token_that_validates() {
        let provider = InMemoryIdentityProvider::new();
        let id = provider.register("Ana@Example.com", "secret", "Ana");

        let session = provider.sign_in("ana@example.com", "secret").await.unwrap();
        assert_eq!(session.identity_id, id);

        let restored = provider.validate(&session.to_persisted()).await.unwrap();
        assert_eq!(restored.identity_id, id);
        assert_eq!(provider.live_tokens(), 1);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let provider = InMemoryIdentityProvider::new();
        provider.register("ana@example.com", "secret", "Ana");

        let wrong = provider.sign_in("ana@example.com", "nope").await.unwrap_err();
        let unknown = provider.sign_in("bob@example.com", "secret").await.unwrap_err();
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn sign_out_revokes_the_token() {
        let provider = InMemoryIdentityProvider::new();
        provider.register("ana@example.com", "secret", "Ana");
        let session = provider.sign_in("ana@example.com", "secret").await.unwrap();

        provider.sign_out(&session.access_token).await.unwrap();
        let err = provider.validate(&session.to_persisted()).await.unwrap_err();
        assert_eq!(err, ProviderError::InvalidToken);
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let provider = InMemoryIdentityProvider::new();
        let request = SignUpRequest {
            email: "ana@example.com".into(),
            password: "secret".into(),
            name: "Ana".into(),
        };
        provider.sign_up(&request).await.unwrap();
        assert_eq!(provider.display_name_of("ana@example.com").as_deref(), Some("Ana"));
        assert!(matches!(provider.sign_up(&request).await, Err(ProviderError::Rejected(_))));
    }

    #[tokio::test]
    async fn offline_provider_reports_network_errors() {
        let provider = InMemoryIdentityProvider::new();
        provider.register("ana@example.com", "secret", "Ana");
        provider.set_offline(true);
        assert!(matches!(
            provider.sign_in("ana@example.com", "secret").await,
            Err(ProviderError::Network(_))
        ));
    }

    #[tokio::test]
    async fn paused_validation_waits_for_release() {
        let provider = InMemoryIdentityProvider::new();
        provider.register("ana@example.com", "secret", "Ana");
        let session = provider.sign_in("ana@example.com", "secret").await.unwrap();
        provider.pause_validations();

        let persisted = session.to_persisted();
        let (restored, ()) = tokio::join!(provider.validate(&persisted), async {
            tokio::task::yield_now().await;
            provider.release_validations(1);
        });
        assert_eq!(restored.unwrap().identity_id, session.identity_id);
    }

    #[tokio::test]
    async fn expired_grant_does_not_validate() {
        let provider = InMemoryIdentityProvider::with_token_ttl(Duration::milliseconds(20));
        provider.register("ana@example.com", "secret", "Ana");
        let session = provider.sign_in("ana@example.com", "secret").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        assert_eq!(provider.validate(&session.to_persisted()).await.unwrap_err(), ProviderError::InvalidToken);
    }
}
