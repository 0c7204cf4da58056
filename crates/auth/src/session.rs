use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use indica_core::IdentityId;

/// Raw bearer token issued by the identity provider.
///
/// Never printed: `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl core::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Who is signed in, without the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
}

/// The live authenticated session. Owned exclusively by the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity_id: IdentityId,
    pub email: String,
    pub access_token: AccessToken,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.identity_id,
            email: self.email.clone(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// What survives a restart.
    pub fn to_persisted(&self) -> PersistedToken {
        PersistedToken {
            access_token: self.access_token.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// Token persisted between runs so the session can be restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedToken {
    pub access_token: AccessToken,
    pub expires_at: DateTime<Utc>,
}

impl PersistedToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Session store status as seen by every consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "identity", rename_all = "snake_case")]
pub enum SessionStatus {
    /// `restore_session` has not settled yet.
    Restoring,
    Anonymous,
    Authenticated(Identity),
}

impl SessionStatus {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionStatus::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, SessionStatus::Restoring)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token is empty")]
    Empty,
}

/// Check a session handed back by the provider before accepting it.
///
/// Signature checks are the provider's business; this only rejects sessions that are
/// unusable on arrival.
pub fn validate_session(session: &Session, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if session.access_token.is_blank() {
        return Err(TokenValidationError::Empty);
    }
    if session.is_expired(now) {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(token: &str, expires_in: Duration) -> Session {
        Session {
            identity_id: IdentityId::new(),
            email: "ana@example.com".to_string(),
            access_token: AccessToken::new(token),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let s = session("super-secret", Duration::minutes(5));
        let printed = format!("{s:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("AccessToken(***)"));
    }

    #[test]
    fn validate_rejects_expired_and_blank() {
        let now = Utc::now();
        assert_eq!(validate_session(&session("t", Duration::minutes(5)), now), Ok(()));
        assert_eq!(
            validate_session(&session("t", Duration::minutes(-1)), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_session(&session("  ", Duration::minutes(5)), now),
            Err(TokenValidationError::Empty)
        );
    }

    #[test]
    fn persisted_token_keeps_expiry() {
        let s = session("t", Duration::minutes(5));
        let persisted = s.to_persisted();
        assert_eq!(persisted.expires_at, s.expires_at);
        assert!(!persisted.is_expired(Utc::now()));
        assert!(persisted.is_expired(s.expires_at));
    }
}
