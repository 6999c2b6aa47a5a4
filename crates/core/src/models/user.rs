//! User and session models

use serde::{Deserialize, Serialize};

/// User role as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disabled,
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Active
    }
}

/// User profile from `GET /me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub credits: i64,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An authenticated session: bearer token plus the profile it belongs to.
///
/// Token and user travel together everywhere; a session is never persisted
/// with one half missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Profile,
}

impl Session {
    pub fn new(token: impl Into<String>, user: Profile) -> Self {
        Session {
            token: token.into(),
            user,
        }
    }
}
