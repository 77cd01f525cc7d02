//! User accounts and roles.

use serde::{Deserialize, Serialize};

/// Role of a user, which gates what they can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Full access, including user management.
    Admin,
    /// Executes rounds only.
    Technician,
    /// Creates tasks and templates.
    Analyst,
    /// Reviews reports and dashboards.
    Supervisor,
}

impl UserRole {
    /// Whether the role may create and edit tasks.
    #[must_use]
    pub fn can_manage_tasks(self) -> bool {
        matches!(self, Self::Analyst | Self::Supervisor | Self::Admin)
    }

    /// Whether the role may delete tasks.
    #[must_use]
    pub fn can_delete_tasks(self) -> bool {
        matches!(self, Self::Supervisor | Self::Admin)
    }

    /// Whether the role may see aggregated statistics.
    #[must_use]
    pub fn can_view_stats(self) -> bool {
        !matches!(self, Self::Technician)
    }

    /// Whether the role may manage user accounts.
    #[must_use]
    pub fn can_manage_users(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Technician => write!(f, "technician"),
            Self::Analyst => write!(f, "analyst"),
            Self::Supervisor => write!(f, "supervisor"),
        }
    }
}

/// A user account.
///
/// Passwords are stored and compared in plain text; this store has no
/// authentication security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: String,
    /// Role of the account.
    pub role: UserRole,
    /// Deactivated accounts cannot log in.
    pub active: bool,
    /// Avatar image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Accounts seeded into a fresh store.
#[must_use]
pub fn default_users() -> Vec<User> {
    [
        ("1", "Admin User", "admin@rondaguard.com", UserRole::Admin),
        ("2", "João Técnico", "tec@rondaguard.com", UserRole::Technician),
        ("3", "Maria Supervisora", "sup@rondaguard.com", UserRole::Supervisor),
        ("4", "Carlos Analista", "ana@rondaguard.com", UserRole::Analyst),
    ]
    .into_iter()
    .map(|(id, name, email, role)| User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password: "123".to_string(),
        role,
        active: true,
        avatar: None,
    })
    .collect()
}
