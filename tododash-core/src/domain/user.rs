//! User and authentication models

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Represents an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// Shallow merge: fields present in the patch win
    pub fn merged(&self, patch: &PartialUser) -> Self {
        Self {
            id: patch.id.clone().unwrap_or_else(|| self.id.clone()),
            email: patch.email.clone().unwrap_or_else(|| self.email.clone()),
        }
    }
}

/// A user object where every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Merge-style profile update sent to `PUT /api/users/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
    }
}

/// Email/password pair used for both login and registration
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(Error::validation("Email and password are required"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of the register and login endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}
