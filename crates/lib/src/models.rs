//! Wire types shared by the session and resource layers.
//!
//! Fields the client does not interpret are kept in `extra` so they survive a
//! round trip through the cached profile.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Access/refresh credential pair.
///
/// Both strings are wiped from memory on drop and never appear in `Debug`
/// output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Both halves are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.access.is_empty() && !self.refresh.is_empty()
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Username and password for `/auth/login/`.
#[derive(Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up form for `/auth/register/`.
#[derive(Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct Registration {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// The signed-in user's profile as returned by `/auth/user/me/` and login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Minimal profile with only an id and a username.
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: String::new(),
            full_name: None,
            first_name: None,
            last_name: None,
            role: None,
            is_staff: false,
            is_superuser: false,
            extra: Map::new(),
        }
    }

    /// Staff, superuser, or an explicit `admin` role.
    pub fn is_admin(&self) -> bool {
        self.is_superuser || self.is_staff || self.role.as_deref() == Some("admin")
    }

    pub fn role_display(&self) -> &'static str {
        if self.is_superuser {
            "Superuser"
        } else if self.is_admin() {
            "Administrator"
        } else {
            "User"
        }
    }

    /// Two-letter avatar initials.
    pub fn initials(&self) -> String {
        match (non_empty(&self.first_name), non_empty(&self.last_name)) {
            (Some(first), Some(last)) => first
                .chars()
                .take(1)
                .chain(last.chars().take(1))
                .flat_map(char::to_uppercase)
                .collect(),
            _ if !self.username.is_empty() => self
                .username
                .chars()
                .take(2)
                .flat_map(char::to_uppercase)
                .collect(),
            _ => "?".to_string(),
        }
    }

    /// Display name, falling back to the username.
    pub fn full_name(&self) -> String {
        match (non_empty(&self.first_name), non_empty(&self.last_name)) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            _ => non_empty(&self.full_name)
                .map(str::to_string)
                .unwrap_or_else(|| self.username.clone()),
        }
    }

    /// Admins may edit anything; everyone else only what they own.
    pub fn can_edit(&self, owner_id: Option<u64>) -> bool {
        self.is_admin() || owner_id == Some(self.id)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// A stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    pub original_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comment: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub last_download: Option<String>,
    #[serde(default)]
    pub public_link: Option<String>,
    /// Owner's user id.
    #[serde(default)]
    pub user: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileRecord {
    pub fn new(id: u64, original_name: impl Into<String>) -> Self {
        Self {
            id,
            original_name: original_name.into(),
            size: 0,
            comment: String::new(),
            uploaded_at: None,
            last_download: None,
            public_link: None,
            user: None,
            extra: Map::new(),
        }
    }
}

/// A user as listed by the admin endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub file_count: Option<u64>,
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: String::new(),
            is_staff: false,
            is_active: None,
            file_count: None,
            total_size: None,
            extra: Map::new(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
