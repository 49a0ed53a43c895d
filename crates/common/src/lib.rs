// ================
// common/src/lib.rs
// ================
//! Common types shared between the helpdesk session core and its hosts.
//! This module defines the wire shapes of the `/auth` and `/users` endpoints
//! and the principal the client caches between runs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use zeroize::Zeroize;

/// Token type reported by the server when none is sent
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Role of a helpdesk account
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Regular customer raising tickets
    User,
    /// Agent working the ticket queues
    SupportAgent,
    /// Full administrative access
    Admin,
}

impl UserRole {
    /// All roles, lowest privilege first
    pub const ALL: [UserRole; 3] = [UserRole::User, UserRole::SupportAgent, UserRole::Admin];

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::SupportAgent => "SUPPORT_AGENT",
            UserRole::Admin => "ADMIN",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::User => "User",
            UserRole::SupportAgent => "Support Agent",
            UserRole::Admin => "Administrator",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Agents and admins can work the ticket queues
    pub fn has_support_privileges(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SupportAgent)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not one of the known roles
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for UserRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(UserRole::User),
            "SUPPORT_AGENT" => Ok(UserRole::SupportAgent),
            "ADMIN" => Ok(UserRole::Admin),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// The authenticated user as known to the client.
///
/// Replaced wholesale on every fetch; the client never edits it in place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Server computed "first last"; older payloads may omit it
    #[serde(default)]
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Principal {
    /// Name to show in the UI, falling back to first and last name
    pub fn display_name(&self) -> String {
        if self.full_name.trim().is_empty() {
            format!("{} {}", self.first_name, self.last_name).trim().to_string()
        } else {
            self.full_name.clone()
        }
    }

    /// Upper-cased initials, e.g. "JD" for Jane Doe
    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .take(1)
            .chain(self.last_name.chars().take(1))
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// Opaque bearer credential issued by the server.
///
/// Never parsed by the client. The inner string is wiped on drop and kept
/// out of `Debug` output.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header
    pub fn bearer(&self) -> String {
        format!("{DEFAULT_TOKEN_TYPE} {}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

/// Body returned by `/auth/login`, `/auth/register` and `/auth/refresh`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub token: SessionToken,
    #[serde(rename = "type", default = "default_token_type")]
    pub token_type: String,
    pub user: Principal,
}

/// Body of `/auth/login`
#[derive(Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Drop for LoginRequest {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Body of `/auth/register`
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

impl Drop for RegisterRequest {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}
