//! Role resolver: maps the signed-in identity to a role, once per identity change.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use indica_core::{IdentityId, PixKey};
use indica_events::{InMemoryBus, Notification, NotificationBus, Subscription};

use crate::notifications::{RoleChanged, SessionChanged};
use crate::profile::{Profile, ProfileDirectory};
use crate::role::{Role, RoleState};

#[derive(Debug)]
struct State {
    /// Newest session generation seen.
    generation: u64,
    identity: Option<IdentityId>,
    role: RoleState,
    profile: Option<Profile>,
}

/// Result of one profile lookup, tagged with the generation that asked for it.
#[derive(Debug)]
struct Lookup {
    generation: u64,
    identity: IdentityId,
}

/// What a session change asks of the resolver.
#[derive(Debug)]
enum Step {
    /// Duplicate or older than what was already seen.
    Ignore,
    /// Settled without a lookup (signed out).
    Settled,
    Lookup(Lookup),
}

type InFlight<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Turns [`SessionChanged`] notifications into a [`RoleState`].
///
/// - identity absent: `Anonymous`, synchronously
/// - identity present: `Pending`, then exactly one profile lookup
/// - lookups finishing after a newer generation arrived are dropped
pub struct RoleResolver<D> {
    directory: D,
    state: Mutex<State>,
    bus: InMemoryBus<RoleChanged>,
}

impl<D> RoleResolver<D>
where
    D: ProfileDirectory,
{
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            state: Mutex::new(State {
                generation: 0,
                identity: None,
                role: RoleState::Pending,
                profile: None,
            }),
            bus: InMemoryBus::new(),
        }
    }

    pub fn subscribe(&self) -> Subscription<RoleChanged> {
        self.bus.subscribe()
    }

    pub fn state(&self) -> RoleState {
        self.lock().role
    }

    /// Role state and the session generation it belongs to, read together.
    pub fn snapshot(&self) -> (RoleState, u64) {
        let state = self.lock();
        (state.role, state.generation)
    }

    pub fn profile(&self) -> Option<Profile> {
        self.lock().profile.clone()
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Apply one session change and, if it names an identity, resolve its role.
    pub async fn on_session_changed(&self, change: &SessionChanged) {
        if let Step::Lookup(lookup) = self.begin(change) {
            self.resolve(lookup).await;
        }
    }

    /// Look the role up again after a failed lookup. No-op in any other state.
    pub async fn retry(&self) {
        let lookup = {
            let mut state = self.lock();
            match (state.role, state.identity) {
                (RoleState::Unresolved, Some(identity)) => {
                    state.role = RoleState::Pending;
                    self.announce(&state);
                    Some(Lookup {
                        generation: state.generation,
                        identity,
                    })
                }
                _ => None,
            }
        };

        if let Some(lookup) = lookup {
            self.resolve(lookup).await;
        }
    }

    /// Drive the resolver from a session subscription until the bus closes.
    ///
    /// A new change drops the lookup still in flight for the previous one.
    pub async fn follow(&self, mut subscription: Subscription<SessionChanged>) {
        let mut in_flight: Option<InFlight<'_>> = None;

        loop {
            tokio::select! {
                change = subscription.recv() => {
                    let Some(change) = change else { break };
                    match self.begin(&change) {
                        Step::Ignore => {}
                        Step::Settled => in_flight = None,
                        Step::Lookup(lookup) => in_flight = Some(Box::pin(self.resolve(lookup))),
                    }
                }
                () = async {
                    match in_flight.as_mut() {
                        Some(lookup) => lookup.await,
                        None => std::future::pending().await,
                    }
                }, if in_flight.is_some() => {
                    in_flight = None;
                }
            }
        }
    }

    /// Keep the cached profile in step after the identity edits its own payout key.
    pub fn record_payout_key(&self, identity: IdentityId, key: PixKey) {
        let mut state = self.lock();
        if let Some(profile) = state.profile.as_mut().filter(|p| p.identity_id == identity) {
            profile.payout_key = Some(key);
        }
    }

    fn begin(&self, change: &SessionChanged) -> Step {
        let mut state = self.lock();
        let generation = change.generation();
        if generation <= state.generation {
            debug!(kind = change.kind(), generation, "ignoring duplicate or stale notification");
            return Step::Ignore;
        }

        state.generation = generation;
        state.profile = None;
        match &change.identity {
            None => {
                state.identity = None;
                state.role = RoleState::Anonymous;
                self.announce(&state);
                Step::Settled
            }
            Some(identity) => {
                state.identity = Some(identity.id);
                state.role = RoleState::Pending;
                self.announce(&state);
                Step::Lookup(Lookup {
                    generation,
                    identity: identity.id,
                })
            }
        }
    }

    async fn resolve(&self, lookup: Lookup) {
        let (role, profile) = match self.directory.get_profile(lookup.identity).await {
            Ok(Some(record)) => {
                let profile = Profile::from(record);
                (RoleState::Resolved(profile.role), Some(profile))
            }
            Ok(None) => {
                debug!(identity_id = %lookup.identity, "no profile row yet; least privilege");
                (RoleState::Resolved(Role::Indicator), None)
            }
            Err(e) => {
                warn!(identity_id = %lookup.identity, error = %e, "profile lookup failed");
                (RoleState::Unresolved, None)
            }
        };

        self.finish(lookup, role, profile);
    }

    fn finish(&self, lookup: Lookup, role: RoleState, profile: Option<Profile>) {
        let mut state = self.lock();
        if state.generation != lookup.generation || state.identity != Some(lookup.identity) {
            debug!(
                generation = lookup.generation,
                current = state.generation,
                "discarding role for superseded session"
            );
            return;
        }

        state.role = role;
        state.profile = profile;
        self.announce(&state);
    }

    fn announce(&self, state: &State) {
        let _ = self.bus.publish(RoleChanged {
            generation: state.generation,
            state: state.role,
        });
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
