//! Firebase-backed identity verifier and profile store.

use async_trait::async_trait;
use coursehall_core::IdentityId;
use coursehall_platform_access::{
    Identity, IdentityVerifier, Profile, ProfileStore, ProfileStoreError, Verification,
    VerifierError,
};
use reqwest::{Client, StatusCode};
use rootcause::Report;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::auth::{ErrorEnvelope, LookupRequest, LookupResponse, SignInRequest, SignInResponse};
use crate::config::FirebaseConfig;
use crate::document::Document;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to the identity toolkit and Firestore REST APIs.
///
/// A successful `verify` keeps the returned ID token so that profile reads
/// are made on behalf of the signed-in user. `revoke` discards it.
pub struct FirebaseBackend {
    client: Client,
    config: FirebaseConfig,
    tokens: Mutex<HashMap<IdentityId, String>>,
}

impl FirebaseBackend {
    /// Creates a backend with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FirebaseConfig) -> Result<Self, Report<VerifierError>> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VerifierError::Unavailable {
                details: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a backend around an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, config: FirebaseConfig) -> Self {
        Self {
            client,
            config,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FirebaseConfig {
        &self.config
    }

    /// Returns true if an ID token is held for `id`.
    pub async fn holds_session(&self, id: &IdentityId) -> bool {
        self.tokens.lock().await.contains_key(id)
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<SignInResponse>, Report<VerifierError>> {
        let response = self
            .client
            .post(self.config.auth_endpoint("signInWithPassword"))
            .query(&[("key", self.config.api_key())])
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| VerifierError::Unavailable {
                details: format!("signInWithPassword request failed: {e}"),
            })?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .json::<SignInResponse>()
                .await
                .map_err(|e| VerifierError::MalformedResponse {
                    details: format!("signInWithPassword: {e}"),
                })?;
            return Ok(Some(body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VerifierError::MalformedResponse {
                details: format!("signInWithPassword error body ({status}): {e}"),
            })?;
        let envelope = ErrorEnvelope::parse(&body);
        if status == StatusCode::BAD_REQUEST && envelope.is_rejection() {
            debug!(code = envelope.code(), "Credentials rejected");
            return Ok(None);
        }

        Err(VerifierError::Unavailable {
            details: format!("signInWithPassword returned {status}: {}", envelope.code()),
        }
        .into())
    }

    async fn email_confirmed(&self, id_token: &str) -> Result<bool, Report<VerifierError>> {
        let response = self
            .client
            .post(self.config.auth_endpoint("lookup"))
            .query(&[("key", self.config.api_key())])
            .json(&LookupRequest { id_token })
            .send()
            .await
            .map_err(|e| VerifierError::Unavailable {
                details: format!("lookup request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(VerifierError::Unavailable {
                details: format!("lookup returned {status}"),
            }
            .into());
        }

        let body = response
            .json::<LookupResponse>()
            .await
            .map_err(|e| VerifierError::MalformedResponse {
                details: format!("lookup: {e}"),
            })?;
        let user = body
            .users
            .first()
            .ok_or_else(|| VerifierError::MalformedResponse {
                details: "lookup returned no users".to_string(),
            })?;
        Ok(user.email_verified)
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseBackend {
    #[instrument(skip_all)]
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Verification, Report<VerifierError>> {
        let Some(signed_in) = self.sign_in(email, password).await? else {
            return Ok(Verification::Rejected);
        };

        let id = IdentityId::new(signed_in.local_id);
        self.tokens
            .lock()
            .await
            .insert(id.clone(), signed_in.id_token.clone());

        let email_confirmed = match self.email_confirmed(&signed_in.id_token).await {
            Ok(confirmed) => confirmed,
            Err(report) => {
                self.tokens.lock().await.remove(&id);
                return Err(report);
            }
        };

        let email = if signed_in.email.is_empty() {
            email.to_string()
        } else {
            signed_in.email
        };
        debug!(identity_id = %id, email_confirmed, "Verified credentials");
        Ok(Verification::Verified(Identity::new(
            id,
            email,
            email_confirmed,
        )))
    }

    async fn revoke(&self, id: &IdentityId) -> Result<(), Report<VerifierError>> {
        if self.tokens.lock().await.remove(id).is_some() {
            debug!(identity_id = %id, "Discarded ID token");
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FirebaseBackend {
    #[instrument(skip_all, fields(identity_id = %id))]
    async fn get_profile(
        &self,
        id: &IdentityId,
    ) -> Result<Option<Profile>, Report<ProfileStoreError>> {
        let token = self.tokens.lock().await.get(id).cloned();
        let mut request = self
            .client
            .get(self.config.profile_document_url(id.as_str()));
        request = match token {
            Some(token) => request.bearer_auth(token),
            None => request.query(&[("key", self.config.api_key())]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ProfileStoreError::Unavailable {
                details: format!("profile request failed: {e}"),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ProfileStoreError::Unauthorized {
                    identity_id: id.clone(),
                }
                .into())
            }
            status if status.is_success() => {
                let document = response.json::<Document>().await.map_err(|e| {
                    ProfileStoreError::Malformed {
                        identity_id: id.clone(),
                        details: e.to_string(),
                    }
                })?;
                document.into_profile(id).map(Some)
            }
            status => Err(ProfileStoreError::Unavailable {
                details: format!("profile request returned {status}"),
            }
            .into()),
        }
    }
}

impl std::fmt::Debug for FirebaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseBackend")
            .field("project_id", &self.config.project_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, Uri};
    use coursehall_platform_access::{AccountStatus, Role};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn backend() -> FirebaseBackend {
        FirebaseBackend::with_client(Client::new(), FirebaseConfig::new("key", "demo"))
    }

    #[tokio::test]
    async fn revoke_without_session_is_ok() {
        let backend = backend();
        backend
            .revoke(&IdentityId::new("nobody"))
            .await
            .expect("revoke");
    }

    #[tokio::test]
    async fn revoke_discards_held_token() {
        let backend = backend();
        let id = IdentityId::new("u1");
        backend
            .tokens
            .lock()
            .await
            .insert(id.clone(), "token".to_string());
        assert!(backend.holds_session(&id).await);

        backend.revoke(&id).await.expect("revoke");

        assert!(!backend.holds_session(&id).await);
    }

    #[tokio::test]
    async fn unreachable_provider_is_an_error_not_a_rejection() {
        let config = FirebaseConfig::new("key", "demo")
            .with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9");
        let backend = FirebaseBackend::with_client(Client::new(), config);

        assert!(backend.verify("a@example.com", "pw").await.is_err());
        assert!(backend.get_profile(&IdentityId::new("u1")).await.is_err());
    }

    #[test]
    fn debug_hides_credentials() {
        let rendered = format!("{:?}", backend());
        assert!(rendered.contains("demo"));
        assert!(!rendered.contains("key"));
    }

    /// Canned identity toolkit and Firestore responses.
    #[derive(Clone)]
    struct Stub {
        sign_in: (axum::http::StatusCode, Value),
        lookup: (axum::http::StatusCode, Value),
        document: (axum::http::StatusCode, Value),
        document_auth: Arc<std::sync::Mutex<Vec<Option<String>>>>,
    }

    impl Stub {
        fn new() -> Self {
            Self {
                sign_in: (
                    axum::http::StatusCode::OK,
                    json!({ "localId": "u1", "email": "alice@example.com", "idToken": "tok-1" }),
                ),
                lookup: (
                    axum::http::StatusCode::OK,
                    json!({ "users": [ { "localId": "u1", "emailVerified": true } ] }),
                ),
                document: (axum::http::StatusCode::NOT_FOUND, json!({})),
                document_auth: Arc::default(),
            }
        }

        fn sign_in_error(mut self, message: &str) -> Self {
            self.sign_in = (
                axum::http::StatusCode::BAD_REQUEST,
                json!({ "error": { "code": 400, "message": message } }),
            );
            self
        }

        fn lookup(mut self, status: axum::http::StatusCode, body: Value) -> Self {
            self.lookup = (status, body);
            self
        }

        fn document(mut self, status: axum::http::StatusCode, body: Value) -> Self {
            self.document = (status, body);
            self
        }

        fn document_auth(&self) -> Vec<Option<String>> {
            self.document_auth.lock().unwrap().clone()
        }

        /// Serves the stub and returns a backend pointed at it.
        async fn start(&self) -> FirebaseBackend {
            let router = Router::new().fallback(respond).with_state(self.clone());
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let url = format!("http://{}", listener.local_addr().expect("addr"));
            tokio::spawn(async move {
                axum::serve(listener, router).await.expect("serve");
            });
            backend_at(&url)
        }
    }

    async fn respond(
        State(stub): State<Stub>,
        uri: Uri,
        headers: HeaderMap,
    ) -> (axum::http::StatusCode, Json<Value>) {
        let path = uri.path();
        let (status, body) = if path.ends_with("accounts:signInWithPassword") {
            stub.sign_in
        } else if path.ends_with("accounts:lookup") {
            stub.lookup
        } else if path.contains("/documents/users/") {
            let auth = headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            stub.document_auth.lock().unwrap().push(auth);
            stub.document
        } else {
            (axum::http::StatusCode::NOT_FOUND, json!({}))
        };
        (status, Json(body))
    }

    fn backend_at(url: &str) -> FirebaseBackend {
        let client = Client::builder().no_proxy().build().expect("client");
        FirebaseBackend::with_client(
            client,
            FirebaseConfig::new("key", "demo").with_endpoints(url, url),
        )
    }

    fn member_document() -> Value {
        json!({
            "name": "projects/demo/databases/(default)/documents/users/u1",
            "fields": {
                "role": { "stringValue": "user" },
                "status": { "stringValue": "active" },
                "membershipStart": { "timestampValue": "2024-01-01T00:00:00Z" },
                "membershipEnd": { "timestampValue": "2024-12-31T00:00:00Z" },
            },
        })
    }

    #[tokio::test]
    async fn credential_errors_are_rejections() {
        for message in ["INVALID_LOGIN_CREDENTIALS", "EMAIL_NOT_FOUND", "INVALID_PASSWORD"] {
            let backend = Stub::new().sign_in_error(message).start().await;

            let verification = backend
                .verify("alice@example.com", "wrong")
                .await
                .expect("verify");

            assert_eq!(verification, Verification::Rejected, "{message}");
            assert!(!backend.holds_session(&IdentityId::new("u1")).await);
        }
    }

    #[tokio::test]
    async fn throttling_is_an_error() {
        let backend = Stub::new()
            .sign_in_error("TOO_MANY_ATTEMPTS_TRY_LATER : Access temporarily disabled")
            .start()
            .await;

        let report = backend
            .verify("alice@example.com", "pw")
            .await
            .expect_err("throttled");

        assert!(report.to_string().contains("TOO_MANY_ATTEMPTS_TRY_LATER"));
    }

    #[tokio::test]
    async fn verify_reads_confirmation_and_holds_token() {
        let backend = Stub::new().start().await;

        let verification = backend.verify("alice@example.com", "pw").await.expect("verify");

        assert_eq!(
            verification,
            Verification::Verified(Identity::new(IdentityId::new("u1"), "alice@example.com", true))
        );
        assert!(backend.holds_session(&IdentityId::new("u1")).await);
    }

    #[tokio::test]
    async fn unconfirmed_email_is_reported() {
        let backend = Stub::new()
            .lookup(
                axum::http::StatusCode::OK,
                json!({ "users": [ { "localId": "u1", "emailVerified": false } ] }),
            )
            .start()
            .await;

        let Verification::Verified(identity) =
            backend.verify("alice@example.com", "pw").await.expect("verify")
        else {
            panic!("expected verified identity");
        };

        assert!(!identity.email_confirmed);
    }

    #[tokio::test]
    async fn failed_lookup_discards_token() {
        let backend = Stub::new()
            .lookup(axum::http::StatusCode::INTERNAL_SERVER_ERROR, json!({}))
            .start()
            .await;

        assert!(backend.verify("alice@example.com", "pw").await.is_err());
        assert!(!backend.holds_session(&IdentityId::new("u1")).await);
    }

    #[tokio::test]
    async fn profile_read_uses_held_token() {
        let stub = Stub::new().document(axum::http::StatusCode::OK, member_document());
        let backend = stub.start().await;
        let id = IdentityId::new("u1");
        backend.verify("alice@example.com", "pw").await.expect("verify");

        let profile = backend
            .get_profile(&id)
            .await
            .expect("get_profile")
            .expect("profile");

        assert_eq!(profile.id(), &id);
        assert_eq!(profile.role(), Role::User);
        assert_eq!(profile.status(), AccountStatus::Active);
        assert!(profile.membership_window().is_some());
        assert_eq!(stub.document_auth(), vec![Some("Bearer tok-1".to_string())]);
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let backend = Stub::new()
            .document(
                axum::http::StatusCode::NOT_FOUND,
                json!({ "error": { "code": 404, "status": "NOT_FOUND" } }),
            )
            .start()
            .await;

        let profile = backend
            .get_profile(&IdentityId::new("u1"))
            .await
            .expect("get_profile");

        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn denied_document_read_is_unauthorized() {
        for status in [
            axum::http::StatusCode::UNAUTHORIZED,
            axum::http::StatusCode::FORBIDDEN,
        ] {
            let backend = Stub::new()
                .document(status, json!({ "error": { "code": status.as_u16() } }))
                .start()
                .await;

            let report = backend
                .get_profile(&IdentityId::new("u1"))
                .await
                .expect_err("unauthorized");

            assert!(report.to_string().contains("not authorized to read profile u1"));
        }
    }

    #[tokio::test]
    async fn server_error_on_document_read_is_unavailable() {
        let backend = Stub::new()
            .document(axum::http::StatusCode::SERVICE_UNAVAILABLE, json!({}))
            .start()
            .await;

        let report = backend
            .get_profile(&IdentityId::new("u1"))
            .await
            .expect_err("unavailable");

        assert!(report.to_string().contains("profile store unavailable"));
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.expect("read");
            if n == 0 {
                return;
            }
            request.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .and_then(|value| value.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn truncated_error_body_is_malformed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("addr"));
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            read_request(&mut socket).await;
            socket
                .write_all(
                    b"HTTP/1.1 400 Bad Request\r\ncontent-type: application/json\r\n\
                      content-length: 64\r\nconnection: close\r\n\r\n{\"error\"",
                )
                .await
                .expect("write");
            let _ = socket.shutdown().await;
        });

        let report = backend_at(&url)
            .verify("alice@example.com", "pw")
            .await
            .expect_err("truncated");

        assert!(report
            .to_string()
            .contains("malformed identity provider response"));
    }
}
