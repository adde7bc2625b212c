//! The login admission procedure.
//!
//! [`AdmissionGate`] decides whether a credential proof becomes a session.
//! Checks run in a fixed order and the first failing check determines the
//! denial reason:
//!
//! 1. credentials (identity provider)
//! 2. email confirmation, unless the distinguished account
//! 3. profile exists
//! 4. profile is active
//! 5. for non-admins, membership dates present and containing `now`
//!
//! Every denial revokes the identity session established in step 1 and clears
//! the stored session. Collaborator faults become `TransientError`.

use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::config::AdmissionConfig;
use crate::error::DenialReason;
use crate::identity::{IdentityLease, IdentityVerifier, Verification};
use crate::policy::{Clock, SystemClock, check_identity, check_profile};
use crate::profile::ProfileStore;
use crate::session::Session;
use crate::store::SessionStore;

/// Login admission over an identity provider, a profile store and a session
/// store.
#[derive(Clone)]
pub struct AdmissionGate {
    verifier: Arc<dyn IdentityVerifier>,
    profiles: Arc<dyn ProfileStore>,
    sessions: Arc<dyn SessionStore>,
    config: AdmissionConfig,
    clock: Arc<dyn Clock>,
}

impl AdmissionGate {
    /// Creates a gate using the system clock.
    #[must_use]
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        profiles: Arc<dyn ProfileStore>,
        sessions: Arc<dyn SessionStore>,
        config: AdmissionConfig,
    ) -> Self {
        Self {
            verifier,
            profiles,
            sessions,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for membership window checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the admission configuration.
    #[must_use]
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Logs in with an email and password.
    ///
    /// This is the operation forms and route guards use; see
    /// [`admit`](Self::admit) for the rules.
    ///
    /// # Errors
    ///
    /// Returns the reason the login was refused.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, DenialReason> {
        self.admit(email, password).await
    }

    /// Runs the admission checks and persists the session on success.
    ///
    /// # Errors
    ///
    /// Returns the first failing check's `DenialReason`. Faults from the
    /// collaborators are logged and reported as `TransientError`.
    #[instrument(skip_all)]
    pub async fn admit(&self, email: &str, password: &str) -> Result<Session, DenialReason> {
        let verification = match self.verifier.verify(email, password).await {
            Ok(verification) => verification,
            Err(report) => {
                error!(error = %report, "Identity verification failed");
                return Err(self.deny(None, DenialReason::TransientError).await);
            }
        };

        let identity = match verification {
            Verification::Verified(identity) => identity,
            Verification::Rejected => {
                return Err(self.deny(None, DenialReason::InvalidCredentials).await);
            }
        };

        let lease = IdentityLease::acquire(Arc::clone(&self.verifier), identity);

        if let Err(reason) = check_identity(lease.identity(), &self.config) {
            return Err(self.deny(Some(lease), reason).await);
        }

        let profile = match self.profiles.get_profile(&lease.identity().id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                return Err(self.deny(Some(lease), DenialReason::ProfileMissing).await);
            }
            Err(report) => {
                error!(
                    identity_id = %lease.identity().id,
                    error = %report,
                    "Profile lookup failed"
                );
                return Err(self.deny(Some(lease), DenialReason::TransientError).await);
            }
        };

        if let Err(reason) = check_profile(&profile, self.clock.now()) {
            return Err(self.deny(Some(lease), reason).await);
        }

        let session = Session::new(profile, email);
        if let Err(report) = self.sessions.save(&session).await {
            error!(
                identity_id = %lease.identity().id,
                error = %report,
                "Failed to persist session"
            );
            return Err(self.deny(Some(lease), DenialReason::TransientError).await);
        }

        let identity = lease.keep();
        info!(identity_id = %identity.id, role = %session.role(), "Login admitted");
        Ok(session)
    }

    /// Returns the persisted session, if a readable one exists.
    pub async fn restore(&self) -> Option<Session> {
        self.sessions.load().await
    }

    /// Ends a session: revokes the identity session and clears the store.
    ///
    /// Collaborator failures are logged; the local session is always
    /// considered ended.
    pub async fn logout(&self, session: &Session) {
        let id = session.identity_id();
        if let Err(report) = self.verifier.revoke(id).await {
            warn!(identity_id = %id, error = %report, "Failed to revoke identity session on logout");
        }
        if let Err(report) = self.sessions.clear().await {
            warn!(error = %report, "Failed to clear stored session on logout");
        }
        info!(identity_id = %id, "Logged out");
    }

    /// Clears the store before revoking. If this future is dropped, the
    /// unreleased lease revokes from `Drop`.
    async fn deny(&self, lease: Option<IdentityLease>, reason: DenialReason) -> DenialReason {
        if let Err(report) = self.sessions.clear().await {
            warn!(error = %report, "Failed to clear stored session after denial");
        }
        if let Some(lease) = lease {
            lease.release().await;
        }
        info!(reason = reason.code(), "Login denied");
        reason
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
