//! Verified identities and the identity provider contract.
//!
//! A successful `verify` establishes an identity-level session at the
//! provider. The admission procedure holds it through an [`IdentityLease`],
//! which guarantees the session is revoked unless the login is admitted.

use async_trait::async_trait;
use coursehall_core::IdentityId;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::VerifierError;

/// An identity proven by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-issued identifier, stable for the lifetime of the account.
    pub id: IdentityId,
    /// Login email address.
    pub email: String,
    /// True once the account has confirmed ownership of its email.
    pub email_confirmed: bool,
}

impl Identity {
    /// Creates an identity.
    #[must_use]
    pub fn new(id: IdentityId, email: impl Into<String>, email_confirmed: bool) -> Self {
        Self {
            id,
            email: email.into(),
            email_confirmed,
        }
    }
}

/// Outcome of a credential check that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The credentials are valid; an identity session now exists.
    Verified(Identity),
    /// The provider refused the credentials. No session was established.
    Rejected,
}

/// Trait for the external identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Checks an email/password pair.
    ///
    /// Unknown accounts, wrong passwords and malformed input all produce
    /// `Verification::Rejected`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the provider could not give an answer.
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Verification, Report<VerifierError>>;

    /// Releases the identity session established by `verify`.
    ///
    /// Revoking an identity without a session is not an error.
    async fn revoke(&self, id: &IdentityId) -> Result<(), Report<VerifierError>>;
}

/// Scoped hold on an identity session.
///
/// Call [`release`](Self::release) on denial or [`keep`](Self::keep) on
/// admission. A lease dropped while still armed (for example because the
/// surrounding future was cancelled) spawns the revoke on the current tokio
/// runtime.
pub struct IdentityLease {
    verifier: Arc<dyn IdentityVerifier>,
    identity: Identity,
    armed: bool,
}

impl IdentityLease {
    /// Takes ownership of a freshly verified identity session.
    #[must_use]
    pub fn acquire(verifier: Arc<dyn IdentityVerifier>, identity: Identity) -> Self {
        Self {
            verifier,
            identity,
            armed: true,
        }
    }

    /// Returns the leased identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Revokes the identity session now.
    ///
    /// Revoke failures are logged; there is nothing further the caller can
    /// do about them. The lease stays armed until the revoke completes, so a
    /// release cancelled mid-flight is retried from `Drop`.
    pub async fn release(mut self) {
        let result = self.verifier.revoke(&self.identity.id).await;
        self.armed = false;
        if let Err(report) = result {
            warn!(
                identity_id = %self.identity.id,
                error = %report,
                "Failed to revoke identity session"
            );
        } else {
            debug!(identity_id = %self.identity.id, "Revoked identity session");
        }
    }

    /// Keeps the identity session alive and returns the identity.
    #[must_use]
    pub fn keep(mut self) -> Identity {
        self.armed = false;
        self.identity.clone()
    }
}

impl Drop for IdentityLease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let id = self.identity.id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let verifier = Arc::clone(&self.verifier);
                handle.spawn(async move {
                    if let Err(report) = verifier.revoke(&id).await {
                        warn!(
                            identity_id = %id,
                            error = %report,
                            "Failed to revoke abandoned identity session"
                        );
                    }
                });
            }
            Err(_) => {
                warn!(
                    identity_id = %id,
                    "Identity session abandoned outside a runtime; not revoked"
                );
            }
        }
    }
}

impl std::fmt::Debug for IdentityLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityLease")
            .field("identity", &self.identity)
            .field("armed", &self.armed)
            .finish()
    }
}
