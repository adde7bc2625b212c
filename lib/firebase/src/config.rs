//! Firebase project configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the Firebase identity toolkit and Firestore APIs.
///
/// The endpoint URLs default to the public Google endpoints and can be
/// pointed at the local emulator suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Web API key of the project.
    api_key: String,
    /// Project identifier.
    project_id: String,
    /// Firestore collection holding profiles keyed by identity id.
    /// Default: "users"
    #[serde(default = "default_profiles_collection")]
    profiles_collection: String,
    /// Base URL of the identity toolkit API.
    /// Default: "https://identitytoolkit.googleapis.com"
    #[serde(default = "default_auth_url")]
    auth_url: String,
    /// Base URL of the Firestore API.
    /// Default: "https://firestore.googleapis.com"
    #[serde(default = "default_firestore_url")]
    firestore_url: String,
}

fn default_profiles_collection() -> String {
    "users".to_string()
}

fn default_auth_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_firestore_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

impl FirebaseConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            profiles_collection: default_profiles_collection(),
            auth_url: default_auth_url(),
            firestore_url: default_firestore_url(),
        }
    }

    /// Points both APIs at an emulator host, e.g. `http://127.0.0.1:9099`
    /// for auth and `http://127.0.0.1:8080` for Firestore.
    #[must_use]
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        firestore_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.firestore_url = firestore_url.into();
        self
    }

    /// Sets the profiles collection.
    #[must_use]
    pub fn with_profiles_collection(mut self, collection: impl Into<String>) -> Self {
        self.profiles_collection = collection.into();
        self
    }

    /// Returns the web API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the project identifier.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns the profiles collection name.
    #[must_use]
    pub fn profiles_collection(&self) -> &str {
        &self.profiles_collection
    }

    /// Returns the URL of an identity toolkit method, without the key.
    #[must_use]
    pub fn auth_endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{method}",
            self.auth_url.trim_end_matches('/')
        )
    }

    /// Returns the URL of a profile document.
    #[must_use]
    pub fn profile_document_url(&self, id: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}/{id}",
            self.firestore_url.trim_end_matches('/'),
            self.project_id,
            self.profiles_collection,
        )
    }
}
