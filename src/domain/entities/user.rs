//! Agent account entity.

use serde::{Deserialize, Serialize};

/// Unique identifier for a desk account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl UserId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Role of a desk account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum UserRole {
    Admin,
    #[default]
    Agent,
}

impl UserRole {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agent => "agent",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "agent" => Ok(Self::Agent),
            other => Err(format!("unknown role '{other}', expected admin or agent")),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent or administrator of the desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Account id.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Name shown to other agents.
    #[serde(default)]
    pub full_name: String,
    /// Permission level.
    #[serde(default)]
    pub role: UserRole,
    /// Disabled accounts cannot log in.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl User {
    /// Creates an active agent account.
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            full_name: full_name.into(),
            role: UserRole::Agent,
            is_active: true,
        }
    }

    /// Sets the role.
    #[must_use]
    pub const fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    /// Whether the account may manage users and customers.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    /// Name to show for this user, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_user() {
        let json = r#"{"id":3,"email":"ana@desk.io","fullName":"Ana","role":"admin","isActive":false}"#;
        let user: User = serde_json::from_str(json).unwrap();

        assert_eq!(user.id, UserId(3));
        assert!(user.is_admin());
        assert!(!user.is_active);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("Admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_new_user_is_active_agent() {
        let user = User::new(UserId(1), "agent@desk.io", "Bia");
        assert!(user.is_active);
        assert!(!user.is_admin());
        assert!(user.with_role(UserRole::Admin).is_admin());
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = User::new(UserId(1), "agent@desk.io", "  ");
        assert_eq!(user.display_name(), "agent@desk.io");
    }
}
