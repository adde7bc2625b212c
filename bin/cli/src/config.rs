//! CLI configuration.
//!
//! Loaded via the `config` crate from `COURSEHALL__*` environment variables,
//! for example `COURSEHALL__FIREBASE__API_KEY` or
//! `COURSEHALL__ADMISSION__DISTINGUISHED_EMAIL`.

use coursehall_firebase::FirebaseConfig;
use coursehall_platform_access::{AdmissionConfig, SessionConfig};
use serde::Deserialize;

const ENV_PREFIX: &str = "COURSEHALL";

/// Application configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Admission policy configuration.
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Where the session is persisted.
    #[serde(default)]
    pub session: SessionConfig,

    /// Firebase project configuration.
    pub firebase: FirebaseConfig,
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(environment())
    }

    fn from_environment(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).separator("__")
}
