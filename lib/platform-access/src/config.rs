//! Configuration for admission and session persistence.
//!
//! Both types deserialize with defaults so they can be loaded from partial
//! environment configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::session::StorageKey;

/// Configuration injected into the admission procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Email of the operational account allowed to log in before confirming
    /// its email address. Matched by exact string equality. `None` disables
    /// the bypass.
    #[serde(default)]
    distinguished_email: Option<String>,
}

impl AdmissionConfig {
    /// Creates a configuration without a distinguished account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the distinguished account email.
    #[must_use]
    pub fn with_distinguished_email(mut self, email: impl Into<String>) -> Self {
        self.distinguished_email = Some(email.into());
        self
    }

    /// Returns the distinguished account email, if configured.
    #[must_use]
    pub fn distinguished_email(&self) -> Option<&str> {
        self.distinguished_email.as_deref()
    }

    /// Returns true if `email` is exactly the distinguished account email.
    #[must_use]
    pub fn is_distinguished(&self, email: &str) -> bool {
        self.distinguished_email.as_deref() == Some(email)
    }
}

/// Where the session store keeps the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding the session file.
    /// Default: `.coursehall`
    #[serde(default = "default_session_dir")]
    pub dir: PathBuf,

    /// Storage key scoped to this application instance.
    /// Default: `coursehall.session`
    #[serde(default)]
    pub key: StorageKey,
}

fn default_session_dir() -> PathBuf {
    PathBuf::from(".coursehall")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_session_dir(),
            key: StorageKey::default(),
        }
    }
}
