use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse-grained role of an identity.
///
/// `Indicator` is the least-privileged role and the default whenever role data is
/// missing or unrecognised. `Admin` is an implicit superset of every specialised role;
/// there is no access between `Finance` and `Commercial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Indicator,
    Admin,
    Finance,
    Commercial,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Indicator, Role::Admin, Role::Finance, Role::Commercial];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Indicator => "indicator",
            Role::Admin => "admin",
            Role::Finance => "finance",
            Role::Commercial => "commercial",
        }
    }

    /// Label shown in the user management screen.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Indicator => "Indicador",
            Role::Admin => "Admin",
            Role::Finance => "Financeiro",
            Role::Commercial => "Comercial",
        }
    }

    /// Map the raw `role` column of a profile row. Never escalates on bad data.
    pub fn from_profile_value(raw: Option<&str>) -> Role {
        match raw {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::debug!(raw = value, "unrecognised role value; using least privilege");
                Role::Indicator
            }),
            None => Role::Indicator,
        }
    }

    /// True when this role may enter a screen open to `allowed` (admin always may).
    pub fn satisfies(self, allowed: &[Role]) -> bool {
        self == Role::Admin || allowed.contains(&self)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "indicator" => Ok(Role::Indicator),
            "admin" => Ok(Role::Admin),
            "finance" => Ok(Role::Finance),
            "commercial" => Ok(Role::Commercial),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// What the role resolver currently knows about the signed-in identity's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "role", rename_all = "snake_case")]
pub enum RoleState {
    /// No identity is signed in.
    Anonymous,
    /// Waiting on the session to settle or on the profile lookup.
    Pending,
    /// Lookup settled.
    Resolved(Role),
    /// Lookup failed. Decisions that need a role block instead of denying.
    Unresolved,
}

impl RoleState {
    pub fn role(&self) -> Option<Role> {
        match self {
            RoleState::Resolved(role) => Some(*role),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, RoleState::Anonymous | RoleState::Resolved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_parse_case_insensitively() {
        assert_eq!(Role::from_profile_value(Some("finance")), Role::Finance);
        assert_eq!(Role::from_profile_value(Some(" Commercial ")), Role::Commercial);
        assert_eq!(Role::from_profile_value(Some("ADMIN")), Role::Admin);
    }

    #[test]
    fn bad_role_data_degrades_to_indicator() {
        assert_eq!(Role::from_profile_value(None), Role::Indicator);
        assert_eq!(Role::from_profile_value(Some("")), Role::Indicator);
        assert_eq!(Role::from_profile_value(Some("superuser")), Role::Indicator);
    }

    #[test]
    fn admin_satisfies_every_set() {
        assert!(Role::Admin.satisfies(&[Role::Finance]));
        assert!(Role::Admin.satisfies(&[]));
        assert!(!Role::Finance.satisfies(&[Role::Commercial]));
        assert!(!Role::Commercial.satisfies(&[Role::Finance, Role::Admin]));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Commercial).unwrap(), "\"commercial\"");
        let state = serde_json::to_value(RoleState::Resolved(Role::Finance)).unwrap();
        assert_eq!(state, serde_json::json!({ "state": "resolved", "role": "finance" }));
    }
}
