//! Session store: the single source of truth for who is signed in.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use indica_events::{InMemoryBus, Notification, NotificationBus, Subscription};

use crate::error::AuthError;
use crate::notifications::SessionChanged;
use crate::provider::{IdentityProvider, ProviderError, SignUpRequest, TokenStore};
use crate::session::{Identity, PersistedToken, Session, SessionStatus, validate_session};

#[derive(Debug)]
enum Slot {
    Restoring,
    Anonymous,
    Active(Session),
}

#[derive(Debug)]
struct State {
    slot: Slot,
    /// Bumped every time the signed-in identity changes.
    generation: u64,
}

/// Owns the live [`Session`] and announces every identity change.
///
/// Mutations publish [`SessionChanged`]; refreshing the token of the identity that is
/// already signed in does not. A session whose token has expired is ended on the next
/// read, exactly like a sign-out without revocation.
pub struct SessionStore<P, T> {
    provider: P,
    tokens: T,
    state: Mutex<State>,
    bus: InMemoryBus<SessionChanged>,
}

impl<P, T> SessionStore<P, T>
where
    P: IdentityProvider,
    T: TokenStore,
{
    pub fn new(provider: P, tokens: T) -> Self {
        Self {
            provider,
            tokens,
            state: Mutex::new(State {
                slot: Slot::Restoring,
                generation: 0,
            }),
            bus: InMemoryBus::new(),
        }
    }

    pub fn subscribe(&self) -> Subscription<SessionChanged> {
        self.bus.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.snapshot().0
    }

    pub fn generation(&self) -> u64 {
        self.lock_live().generation
    }

    /// Status and generation read together. An expired session is ended first.
    pub fn snapshot(&self) -> (SessionStatus, u64) {
        let state = self.lock_live();
        let status = match &state.slot {
            Slot::Restoring => SessionStatus::Restoring,
            Slot::Anonymous => SessionStatus::Anonymous,
            Slot::Active(session) => SessionStatus::Authenticated(session.identity()),
        };
        (status, state.generation)
    }

    pub fn current_session(&self) -> Option<Session> {
        match &self.lock_live().slot {
            Slot::Active(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let session = match self.provider.sign_in(email, password).await {
            Ok(session) => session,
            Err(e) => {
                info!(error = %e, "sign-in failed");
                return Err(e.into());
            }
        };

        if let Err(e) = validate_session(&session, Utc::now()) {
            warn!(error = %e, "provider issued an unusable session");
            return Err(AuthError::Provider(e.to_string()));
        }

        let identity = session.identity();
        let persisted = session.to_persisted();
        // Install first: ending an expired predecessor clears the stored token.
        self.replace(Some(session));
        self.persist(&persisted);
        info!(identity_id = %identity.id, "signed in");
        Ok(identity)
    }

    /// Request an account. The caller still has to sign in afterwards.
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<(), AuthError> {
        let request = SignUpRequest {
            email: email.trim().to_lowercase(),
            password: password.to_string(),
            name: name.trim().to_string(),
        };
        if request.email.is_empty() || request.password.is_empty() || request.name.is_empty() {
            return Err(AuthError::Validation("email, password and name are required".into()));
        }

        self.provider.sign_up(&request).await?;
        info!("sign-up requested");
        Ok(())
    }

    /// Drop the session locally at once, then ask the provider to revoke it.
    pub async fn sign_out(&self) {
        let previous = self.replace(None);
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "could not clear persisted token");
        }

        let Some(session) = previous else {
            return;
        };
        info!(identity_id = %session.identity_id, "signed out");

        if let Err(e) = self.provider.sign_out(&session.access_token).await {
            warn!(error = %e, "token revocation failed; provider expiry will apply");
        }
    }

    /// Settle the initial state from the persisted token, if any.
    ///
    /// Corrupt, expired or rejected tokens mean "no session" and are discarded.
    pub async fn restore_session(&self) -> SessionStatus {
        let persisted = match self.tokens.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "discarding unreadable persisted token");
                self.discard_token();
                None
            }
        };

        let Some(persisted) = persisted else {
            self.replace(None);
            return self.status();
        };

        if persisted.is_expired(Utc::now()) {
            info!("persisted token expired");
            self.discard_token();
            self.replace(None);
            return self.status();
        }

        if let Some(current) = self.current_session() {
            if current.access_token == persisted.access_token {
                debug!("session already restored");
                return self.status();
            }
        }

        let generation = self.generation();
        let (next, discard) = match self.provider.validate(&persisted).await {
            Ok(session) if validate_session(&session, Utc::now()).is_ok() => (Some(session), false),
            Ok(_) | Err(ProviderError::InvalidToken) | Err(ProviderError::InvalidCredentials) => {
                (None, true)
            }
            Err(e) => {
                // Keep the token so a later restore can try again.
                warn!(error = %e, "could not validate persisted token");
                (None, false)
            }
        };

        let restored = next.as_ref().map(|session| session.identity_id);
        if self.replace_if_current(generation, next, discard) {
            match restored {
                Some(identity_id) => info!(identity_id = %identity_id, "session restored"),
                None if discard => info!("persisted token rejected"),
                None => {}
            }
        }

        self.status()
    }

    fn persist(&self, token: &PersistedToken) {
        if let Err(e) = self.tokens.save(token) {
            warn!(error = %e, "could not persist session token");
        }
    }

    fn discard_token(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "could not clear persisted token");
        }
    }

    /// Install `next` and publish if the identity changed. Returns the replaced session.
    fn replace(&self, next: Option<Session>) -> Option<Session> {
        let mut state = self.lock_live();
        self.install(&mut state, next)
    }

    /// Like `replace`, but only if no identity change happened since `generation` was
    /// read. `discard` also drops the persisted token. Returns whether it applied.
    fn replace_if_current(&self, generation: u64, next: Option<Session>, discard: bool) -> bool {
        let mut state = self.lock_live();
        if state.generation != generation {
            debug!(generation, current = state.generation, "discarding superseded restore result");
            return false;
        }

        if discard {
            self.discard_token();
        }
        self.install(&mut state, next);
        true
    }

    fn install(&self, state: &mut State, next: Option<Session>) -> Option<Session> {
        let same_identity = match (&state.slot, &next) {
            (Slot::Active(current), Some(next)) => current.identity_id == next.identity_id,
            (Slot::Anonymous, None) => true,
            _ => false,
        };

        let identity = next.as_ref().map(Session::identity);
        let slot = match next {
            Some(session) => Slot::Active(session),
            None => Slot::Anonymous,
        };
        let previous = match core::mem::replace(&mut state.slot, slot) {
            Slot::Active(session) => Some(session),
            _ => None,
        };

        if !same_identity {
            self.bump(state, identity);
        }
        previous
    }

    /// New generation. Published under the lock so notifications leave in order.
    fn bump(&self, state: &mut State, identity: Option<Identity>) {
        state.generation += 1;
        let change = SessionChanged {
            generation: state.generation,
            identity,
        };
        debug!(
            kind = change.kind(),
            generation = change.generation(),
            signed_in = change.identity.is_some(),
            "session changed"
        );
        let _ = self.bus.publish(change);
    }

    /// Lock the state, ending the session first if its token has expired.
    fn lock_live(&self) -> MutexGuard<'_, State> {
        let mut state = self.lock();
        let expired = matches!(&state.slot, Slot::Active(session) if session.is_expired(Utc::now()));
        if expired {
            if let Slot::Active(session) = core::mem::replace(&mut state.slot, Slot::Anonymous) {
                info!(identity_id = %session.identity_id, "session expired");
            }
            self.discard_token();
            self.bump(&mut state, None);
        }
        state
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
