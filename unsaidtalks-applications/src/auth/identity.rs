//! User Identity
//!
//! The authenticated actor, its role vocabulary, and the typed inputs used to
//! create and patch it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unsaidtalks_core::{validation_error, DashboardResult};

/// Marketplace role. The exact strings are part of the storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Mentee,
    Mentor,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Mentee, Role::Mentor, Role::Admin, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mentee => "mentee",
            Role::Mentor => "mentor",
            Role::Admin => "admin",
            Role::SuperAdmin => "super-admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mentee" => Ok(Role::Mentee),
            "mentor" => Ok(Role::Mentor),
            "admin" => Ok(Role::Admin),
            "super-admin" => Ok(Role::SuperAdmin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Lets `has_role` take a single role as well as a list of them
impl AsRef<[Role]> for Role {
    fn as_ref(&self) -> &[Role] {
        std::slice::from_ref(self)
    }
}

/// Currently authenticated actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub avatar: String,
    #[serde(default, rename = "isVerified")]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Refreshed on every login and hydration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl Session {
    /// Apply a validated patch. `id` is never touched.
    pub fn apply(&mut self, patch: SessionPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(avatar) = patch.avatar {
            self.avatar = avatar;
        }
        if let Some(verified) = patch.verified {
            self.verified = verified;
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = Some(created_at);
        }
    }
}

/// Login candidate, as returned by the authentication backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SessionInput {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
            avatar: String::new(),
            created_at: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = avatar.into();
        self
    }

    pub fn validate(&self) -> DashboardResult<()> {
        if self.id.trim().is_empty() {
            return Err(validation_error!("id must not be empty", "id", "session_input"));
        }
        if self.email.trim().is_empty() {
            return Err(validation_error!(
                "email must not be empty",
                "email",
                "session_input"
            ));
        }
        Ok(())
    }

    /// Build the session that a successful login publishes
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        Session {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            avatar: self.avatar,
            verified: true,
            created_at: self.created_at,
            last_login: Some(now),
        }
    }
}

/// Partial update of the current session
///
/// There is no `id` field, and `role` can only be replaced, never unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub avatar: Option<String>,
    #[serde(rename = "isVerified")]
    pub verified: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl SessionPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == SessionPatch::default()
    }

    /// Reject patches that would blank a required field
    pub fn validate(&self) -> DashboardResult<()> {
        if matches!(&self.email, Some(email) if email.trim().is_empty()) {
            return Err(validation_error!(
                "email must not be empty",
                "email",
                "session_patch"
            ));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(validation_error!(
                "name must not be empty",
                "name",
                "session_patch"
            ));
        }
        Ok(())
    }
}
