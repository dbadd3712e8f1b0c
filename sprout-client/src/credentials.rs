//! Session and device token persisted between runs

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::{KeyValueStore, StoreError};

pub const AUTH_TOKEN: &str = "authToken";
pub const USER_EMAIL: &str = "userEmail";
pub const USER_ROLE: &str = "userRole";
pub const DEVICE_TOKEN: &str = "deviceToken";

/// Sent as `deviceToken` until push registration stores a real one
pub const PLACEHOLDER_DEVICE_TOKEN: &str = "testtoken";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Guest => "GUEST",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, UnknownRole> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "GUEST" => Ok(Role::Guest),
            _ => Err(UnknownRole(s.to_owned())),
        }
    }
}

/// A logged-in account. The token is opaque and never expires client-side.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub role: Role,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"********")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub email: String,
    /// `None` when the stored role is missing or unrecognised
    pub role: Option<Role>,
}

/// Typed access to the credential keys of a [`KeyValueStore`]
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(AUTH_TOKEN)
    }

    pub fn device_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(DEVICE_TOKEN)
    }

    pub fn set_device_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(DEVICE_TOKEN, token)
    }

    /// Stored device token, or the placeholder
    pub fn device_token_or_placeholder(&self) -> Result<String, StoreError> {
        Ok(self
            .device_token()?
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_DEVICE_TOKEN.to_owned()))
    }

    pub fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        self.store.set(AUTH_TOKEN, &session.token)?;
        self.store.set(USER_EMAIL, &session.email)?;
        self.store.set(USER_ROLE, session.role.as_str())
    }

    /// Removes token, email and role. The device token stays.
    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.store.remove(AUTH_TOKEN)?;
        self.store.remove(USER_EMAIL)?;
        self.store.remove(USER_ROLE)
    }

    /// Full session, only when token, email and a known role are all stored
    pub fn load_session(&self) -> Result<Option<Session>, StoreError> {
        let Some(token) = self.token()?.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let Some(user) = self.current_user()? else {
            return Ok(None);
        };
        Ok(user.role.map(|role| Session {
            token,
            email: user.email,
            role,
        }))
    }

    pub fn current_user(&self) -> Result<Option<CurrentUser>, StoreError> {
        let Some(email) = self.store.get(USER_EMAIL)?.filter(|e| !e.is_empty()) else {
            return Ok(None);
        };
        let role = match self.store.get(USER_ROLE)? {
            Some(raw) => match raw.parse() {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring stored role");
                    None
                }
            },
            None => None,
        };
        Ok(Some(CurrentUser { email, role }))
    }
}
