//! # Caller Identity
//!
//! The principal making a request. Permission predicates receive it, and
//! mutations flagged with `accepts_caller` receive it as `by`.

use serde::{Deserialize, Serialize};

/// Roles ordered by privilege level.
///
/// The `Ord` derivation respects variant declaration order:
/// `Member < Staff < Admin`, so `>=` works for minimum-role checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Ordinary authenticated user.
    Member,
    /// Operator allowed to perform review and enforcement transitions.
    Staff,
    /// Full access.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    /// Parse the string representation produced by [`Role::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Self::Member),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Login name of the caller.
    pub username: String,
    /// The caller's role.
    pub role: Role,
}

impl CallerIdentity {
    /// Create an identity.
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    /// Identity used when authentication is disabled.
    pub fn anonymous_admin() -> Self {
        Self::new("anonymous", Role::Admin)
    }

    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Staff or above.
    pub fn is_staff(&self) -> bool {
        self.has_role(Role::Staff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering() {
        assert!(Role::Member < Role::Staff);
        assert!(Role::Staff < Role::Admin);
    }

    #[test]
    fn is_staff_includes_admin() {
        assert!(!CallerIdentity::new("alice", Role::Member).is_staff());
        assert!(CallerIdentity::new("bob", Role::Staff).is_staff());
        assert!(CallerIdentity::new("root", Role::Admin).is_staff());
    }

    #[test]
    fn role_parse_round_trips_as_str() {
        for role in [Role::Member, Role::Staff, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&CallerIdentity::new("bob", Role::Staff)).unwrap();
        assert_eq!(json, r#"{"username":"bob","role":"staff"}"#);
    }
}
