//! Access gate: the only place access decisions are made.
//!
//! - No IO
//! - No panics
//! - Always yields a decision (pending, redirect or allowed)

use serde::Serialize;

use crate::requirement::AccessRequirement;
use crate::role::RoleState;
use crate::session::SessionStatus;

/// Session and role state read at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSnapshot {
    pub session: SessionStatus,
    pub session_generation: u64,
    pub role: RoleState,
    /// Session generation the role state was computed for.
    pub role_generation: u64,
}

impl AuthSnapshot {
    /// The role, but only if it belongs to the current session.
    pub fn current_role(&self) -> RoleState {
        if self.role_generation == self.session_generation {
            self.role
        } else {
            RoleState::Pending
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccessOutcome {
    /// Not settled yet: show a neutral loading indication, do not redirect.
    Pending,
    Allowed,
    /// No identity: go to the login screen, then come back.
    Unauthenticated { redirect_to: String },
    /// Role does not satisfy the requirement: silently go home.
    Forbidden { redirect_to: String },
}

/// Outcome of one navigation attempt, tagged with the session generation it was
/// computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub outcome: AccessOutcome,
    pub generation: u64,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        self.outcome == AccessOutcome::Allowed
    }

    pub fn is_pending(&self) -> bool {
        self.outcome == AccessOutcome::Pending
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match &self.outcome {
            AccessOutcome::Unauthenticated { redirect_to } | AccessOutcome::Forbidden { redirect_to } => {
                Some(redirect_to.as_str())
            }
            _ => None,
        }
    }
}

/// Decision function consumed by every protected screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGate {
    login_path: String,
    home_path: String,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new("/auth", "/")
    }
}

impl AccessGate {
    pub fn new(login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            home_path: home_path.into(),
        }
    }

    pub fn decide(
        &self,
        snapshot: &AuthSnapshot,
        requirement: &AccessRequirement,
        requested_path: &str,
    ) -> AccessDecision {
        AccessDecision {
            outcome: self.outcome(snapshot, requirement, requested_path),
            generation: snapshot.session_generation,
        }
    }

    /// False once the identity has changed since `decision` was computed.
    pub fn is_current(&self, decision: &AccessDecision, snapshot: &AuthSnapshot) -> bool {
        decision.generation == snapshot.session_generation
    }

    /// Login screen URL carrying the originally requested path.
    pub fn login_target(&self, requested_path: &str) -> String {
        format!("{}?redirect={}", self.login_path, urlencoding::encode(requested_path))
    }

    fn outcome(
        &self,
        snapshot: &AuthSnapshot,
        requirement: &AccessRequirement,
        requested_path: &str,
    ) -> AccessOutcome {
        if !requirement.needs_identity() {
            return AccessOutcome::Allowed;
        }

        match &snapshot.session {
            SessionStatus::Restoring => return AccessOutcome::Pending,
            SessionStatus::Anonymous => {
                return AccessOutcome::Unauthenticated {
                    redirect_to: self.login_target(requested_path),
                };
            }
            SessionStatus::Authenticated(_) => {}
        }

        if !requirement.needs_role() {
            return AccessOutcome::Allowed;
        }

        match snapshot.current_role() {
            RoleState::Resolved(role) if requirement.is_satisfied_by(role) => AccessOutcome::Allowed,
            RoleState::Resolved(_) => AccessOutcome::Forbidden {
                redirect_to: self.home_path.clone(),
            },
            // Unresolved blocks rather than denies; Anonymous here means the role
            // state has not caught up with the session yet.
            RoleState::Pending | RoleState::Unresolved | RoleState::Anonymous => AccessOutcome::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use indica_core::IdentityId;
    use proptest::prelude::*;

    use super::*;
    use crate::role::Role;
    use crate::session::Identity;

    fn signed_in(role: RoleState) -> AuthSnapshot {
        AuthSnapshot {
            session: SessionStatus::Authenticated(Identity {
                id: IdentityId::new(),
                email: "ana@example.com".into(),
            }),
            session_generation: 4,
            role,
            role_generation: 4,
        }
    }

    fn anonymous() -> AuthSnapshot {
        AuthSnapshot {
            session: SessionStatus::Anonymous,
            session_generation: 1,
            role: RoleState::Anonymous,
            role_generation: 1,
        }
    }

    const REQUIREMENTS: [AccessRequirement; 5] = [
        AccessRequirement::Public,
        AccessRequirement::Authenticated,
        AccessRequirement::ADMIN,
        AccessRequirement::FINANCE,
        AccessRequirement::COMMERCIAL,
    ];

    #[test]
    fn unauthenticated_admin_page_redirects_to_login_with_return_path() {
        let gate = AccessGate::default();
        let decision = gate.decide(&anonymous(), &AccessRequirement::ADMIN, "/admin/usuarios");
        assert_eq!(
            decision.outcome,
            AccessOutcome::Unauthenticated {
                redirect_to: "/auth?redirect=%2Fadmin%2Fusuarios".into()
            }
        );
    }

    #[test]
    fn finance_on_commercial_page_goes_home() {
        let gate = AccessGate::default();
        let decision = gate.decide(
            &signed_in(RoleState::Resolved(Role::Finance)),
            &AccessRequirement::COMMERCIAL,
            "/comercial",
        );
        assert_eq!(decision.redirect_target(), Some("/"));
        assert!(matches!(decision.outcome, AccessOutcome::Forbidden { .. }));
    }

    #[test]
    fn admin_on_finance_page_is_allowed() {
        let gate = AccessGate::default();
        let decision = gate.decide(
            &signed_in(RoleState::Resolved(Role::Admin)),
            &AccessRequirement::FINANCE,
            "/financeiro",
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn public_screens_never_wait() {
        let gate = AccessGate::default();
        let restoring = AuthSnapshot {
            session: SessionStatus::Restoring,
            session_generation: 0,
            role: RoleState::Pending,
            role_generation: 0,
        };
        assert!(gate.decide(&restoring, &AccessRequirement::Public, "/faq").is_allowed());
        assert!(gate.decide(&restoring, &AccessRequirement::Authenticated, "/dashboard").is_pending());
    }

    #[test]
    fn role_pages_wait_for_role_but_plain_pages_do_not() {
        let gate = AccessGate::default();
        let snapshot = signed_in(RoleState::Pending);
        assert!(gate.decide(&snapshot, &AccessRequirement::ADMIN, "/admin").is_pending());
        assert!(gate.decide(&snapshot, &AccessRequirement::Authenticated, "/dashboard").is_allowed());
    }

    #[test]
    fn unresolved_role_blocks_instead_of_denying() {
        let gate = AccessGate::default();
        let decision = gate.decide(&signed_in(RoleState::Unresolved), &AccessRequirement::FINANCE, "/financeiro");
        assert!(decision.is_pending());
        assert_eq!(decision.redirect_target(), None);
    }

    #[test]
    fn role_from_an_older_generation_is_not_trusted() {
        let gate = AccessGate::default();
        let mut snapshot = signed_in(RoleState::Resolved(Role::Admin));
        snapshot.role_generation = 3;
        assert!(gate.decide(&snapshot, &AccessRequirement::ADMIN, "/admin").is_pending());
    }

    #[test]
    fn decisions_go_stale_when_identity_changes() {
        let gate = AccessGate::default();
        let before = signed_in(RoleState::Resolved(Role::Admin));
        let decision = gate.decide(&before, &AccessRequirement::ADMIN, "/admin");
        assert!(gate.is_current(&decision, &before));

        let after = AuthSnapshot {
            session_generation: 5,
            role_generation: 5,
            ..anonymous()
        };
        assert!(!gate.is_current(&decision, &after));
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn any_requirement() -> impl Strategy<Value = AccessRequirement> {
        prop::sample::select(REQUIREMENTS.to_vec())
    }

    proptest! {
        /// Property: with no identity only public screens are allowed.
        #[test]
        fn no_identity_means_login(requirement in any_requirement(), path in "/[a-z/]{0,20}") {
            let decision = AccessGate::default().decide(&anonymous(), &requirement, &path);
            if requirement == AccessRequirement::Public {
                prop_assert!(decision.is_allowed());
            } else {
                let is_login_redirect =
                    matches!(decision.outcome, AccessOutcome::Unauthenticated { .. });
                prop_assert!(is_login_redirect);
            }
        }

        /// Property: allowed iff role is in the requirement's set or is admin.
        #[test]
        fn allowed_iff_role_in_set_or_admin(role in any_role(), requirement in any_requirement()) {
            let decision = AccessGate::default().decide(
                &signed_in(RoleState::Resolved(role)),
                &requirement,
                "/x",
            );
            let expected = match requirement {
                AccessRequirement::Public | AccessRequirement::Authenticated => true,
                AccessRequirement::RoleIn(set) => role == Role::Admin || set.contains(&role),
            };
            prop_assert_eq!(decision.is_allowed(), expected);
            if !expected {
                prop_assert_eq!(decision.redirect_target(), Some("/"));
            }
        }
    }
}
