//! Admitted sessions.
//!
//! A session is created only by a successful admission and carries the full
//! profile plus the email the user logged in with. It is persisted through a
//! [`SessionStore`](crate::store::SessionStore) under a [`StorageKey`].

use coursehall_core::IdentityId;
use rootcause::Report;
use serde::{Deserialize, Serialize};

use crate::error::SessionStoreError;
use crate::profile::{MembershipWindow, Profile};
use crate::role::{AccountStatus, Role};

/// Default storage key for the persisted session.
pub const DEFAULT_STORAGE_KEY: &str = "coursehall.session";

/// Key under which a session store persists the session.
///
/// Keys double as file names for file-backed stores, so they are restricted
/// to ASCII alphanumerics, `.`, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Validates and wraps a storage key.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError::InvalidKey` if the key is empty, starts
    /// with a dot or contains characters outside `[A-Za-z0-9._-]`.
    pub fn new(key: impl Into<String>) -> Result<Self, Report<SessionStoreError>> {
        let key = key.into();
        match Self::validate(&key) {
            Ok(()) => Ok(Self(key)),
            Err(reason) => Err(SessionStoreError::InvalidKey { key, reason }.into()),
        }
    }

    fn validate(key: &str) -> Result<(), String> {
        if key.is_empty() {
            return Err("key is empty".to_string());
        }
        if key.starts_with('.') {
            return Err("key must not start with '.'".to_string());
        }
        if let Some(c) = key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(format!("character {c:?} is not allowed"));
        }
        Ok(())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StorageKey {
    fn default() -> Self {
        Self(DEFAULT_STORAGE_KEY.to_string())
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StorageKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::validate(&value).map(|()| Self(value))
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

/// An admitted login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    profile: Profile,
    email: String,
}

impl Session {
    /// Creates a session from an admitted profile and the login email.
    #[must_use]
    pub fn new(profile: Profile, email: impl Into<String>) -> Self {
        Self {
            profile,
            email: email.into(),
        }
    }

    /// Returns the admitted profile.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Returns the email the session was opened with.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the identity id.
    #[must_use]
    pub fn identity_id(&self) -> &IdentityId {
        self.profile.id()
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    /// Returns the account status at admission time.
    #[must_use]
    pub fn status(&self) -> AccountStatus {
        self.profile.status()
    }

    /// Returns the membership window, if the profile has one.
    #[must_use]
    pub fn membership_window(&self) -> Option<MembershipWindow> {
        self.profile.membership_window()
    }

    /// Returns true if the session grants admin access.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile.is_admin()
    }
}
