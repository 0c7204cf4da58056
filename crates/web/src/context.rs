//! The composition root handed by reference to every screen.

use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use indica_auth::{
    AccessDecision, AccessGate, AccessRequirement, AuthError, AuthSnapshot, Identity,
    IdentityProvider, Profile, ProfileDirectory, RoleResolver, RoleState, SessionChanged,
    SessionStatus, SessionStore, TokenStore,
};
use indica_core::{PixKey, PixKeyKind};
use indica_events::Subscription;

use crate::navigation::{NavLink, NavigationPresenter};
use crate::routes::RouteTable;

/// Session store, role resolver and gate wired together.
///
/// Nothing here is global: construct one context per application instance and pass it
/// by reference. [`AuthContext::run`] must be polled for roles to resolve.
pub struct AuthContext<P, D, T> {
    store: SessionStore<P, T>,
    resolver: RoleResolver<D>,
    gate: AccessGate,
    routes: RouteTable,
    navigation: NavigationPresenter,
    /// Taken by `run`; subscribed at construction so no change is missed.
    session_changes: Mutex<Option<Subscription<SessionChanged>>>,
}

impl<P, D, T> AuthContext<P, D, T>
where
    P: IdentityProvider,
    D: ProfileDirectory,
    T: TokenStore,
{
    pub fn new(provider: P, directory: D, tokens: T) -> Self {
        let gate = AccessGate::default();
        Self::with_parts(
            provider,
            directory,
            tokens,
            gate.clone(),
            RouteTable::application(),
            NavigationPresenter::application(gate),
        )
    }

    pub fn with_parts(
        provider: P,
        directory: D,
        tokens: T,
        gate: AccessGate,
        routes: RouteTable,
        navigation: NavigationPresenter,
    ) -> Self {
        let store = SessionStore::new(provider, tokens);
        let session_changes = Mutex::new(Some(store.subscribe()));
        Self {
            store,
            resolver: RoleResolver::new(directory),
            gate,
            routes,
            navigation,
            session_changes,
        }
    }

    /// Feed session changes to the role resolver until the store is dropped.
    ///
    /// Only the first call does anything.
    pub async fn run(&self) {
        let subscription = self
            .session_changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match subscription {
            Some(subscription) => self.resolver.follow(subscription).await,
            None => warn!("auth context is already running"),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        let (session, session_generation) = self.store.snapshot();
        let (role, role_generation) = self.resolver.snapshot();
        AuthSnapshot {
            session,
            session_generation,
            role,
            role_generation,
        }
    }

    /// Wait until session and role are both settled for the same generation.
    ///
    /// `Unresolved` counts as settled. Requires [`AuthContext::run`] to be polled.
    pub async fn settled(&self) -> AuthSnapshot {
        let mut changes = self.resolver.subscribe();
        loop {
            let snapshot = self.snapshot();
            let settled = snapshot.session.is_settled()
                && snapshot.role_generation == snapshot.session_generation
                && snapshot.role != RoleState::Pending;
            if settled {
                return snapshot;
            }
            if changes.recv().await.is_none() {
                return self.snapshot();
            }
        }
    }

    /// Decide whether the screen at `location` may render.
    pub fn navigate(&self, location: &str) -> AccessDecision {
        let route = self.routes.resolve(location);
        self.check(&route.screen.requirement, location)
    }

    pub fn check(&self, requirement: &AccessRequirement, location: &str) -> AccessDecision {
        self.gate.decide(&self.snapshot(), requirement, location)
    }

    /// False once the identity changed after `decision` was made.
    pub fn is_current(&self, decision: &AccessDecision) -> bool {
        self.gate.is_current(decision, &self.snapshot())
    }

    pub fn menu(&self) -> Vec<NavLink> {
        self.navigation
            .visible(&self.snapshot())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn session(&self) -> SessionStatus {
        self.store.status()
    }

    pub fn role(&self) -> RoleState {
        self.snapshot().current_role()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.resolver.profile()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.store.sign_in(email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<(), AuthError> {
        self.store.sign_up(email, password, name).await
    }

    pub async fn sign_out(&self) {
        self.store.sign_out().await;
    }

    pub async fn restore_session(&self) -> SessionStatus {
        self.store.restore_session().await
    }

    /// Look the role up again after the directory was unreachable.
    pub async fn retry_role(&self) {
        self.resolver.retry().await;
    }

    /// Change the signed-in identity's own payout key.
    pub async fn update_payout_key(&self, kind: PixKeyKind, raw: &str) -> Result<PixKey, AuthError> {
        let identity = self
            .store
            .status()
            .identity()
            .cloned()
            .ok_or(AuthError::NotSignedIn)?;
        let key = PixKey::new(kind, raw)?;

        self.resolver
            .directory()
            .update_payout_key(identity.id, &key)
            .await?;
        self.resolver.record_payout_key(identity.id, key.clone());

        info!(identity_id = %identity.id, kind = key.kind().as_str(), "payout key updated");
        Ok(key)
    }
}
