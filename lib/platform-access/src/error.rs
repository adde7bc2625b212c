//! Error types for the platform-access crate.
//!
//! Two families live here:
//! - `DenialReason`: the typed outcome of a refused login. Denials are values
//!   returned to the caller, never faults.
//! - Collaborator errors (`VerifierError`, `ProfileStoreError`,
//!   `SessionStoreError`) carried in rootcause reports. The admission
//!   procedure logs them and reports `DenialReason::TransientError`.

use coursehall_core::IdentityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a login attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The identity provider rejected the credentials. Wrong password and
    /// unknown account are deliberately indistinguishable.
    InvalidCredentials,
    /// The account has not confirmed its email address.
    EmailNotVerified,
    /// No profile exists for the verified identity.
    ProfileMissing,
    /// The profile is paused or deleted.
    AccountInactive,
    /// A member profile lacks a membership start or end date.
    MembershipDatesMissing,
    /// The current time lies outside the member's membership window.
    MembershipNotActive,
    /// A collaborator failed unexpectedly; the attempt may be retried.
    TransientError,
}

impl DenialReason {
    /// Returns a stable machine-readable code for this reason.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::EmailNotVerified => "email_not_verified",
            Self::ProfileMissing => "profile_missing",
            Self::AccountInactive => "account_inactive",
            Self::MembershipDatesMissing => "membership_dates_missing",
            Self::MembershipNotActive => "membership_not_active",
            Self::TransientError => "transient_error",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::EmailNotVerified => write!(f, "email address has not been verified"),
            Self::ProfileMissing => write!(f, "no profile exists for this account"),
            Self::AccountInactive => write!(f, "account is not active"),
            Self::MembershipDatesMissing => write!(f, "membership dates are not set"),
            Self::MembershipNotActive => write!(f, "membership is not currently active"),
            Self::TransientError => write!(f, "login failed due to a temporary error"),
        }
    }
}

impl std::error::Error for DenialReason {}

/// Errors from the identity verifier beyond a plain credential rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifierError {
    /// The identity provider could not be reached or answered unexpectedly.
    Unavailable { details: String },
    /// The provider's response could not be understood.
    MalformedResponse { details: String },
    /// Releasing an identity session failed.
    RevokeFailed { identity_id: IdentityId, details: String },
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { details } => {
                write!(f, "identity provider unavailable: {details}")
            }
            Self::MalformedResponse { details } => {
                write!(f, "malformed identity provider response: {details}")
            }
            Self::RevokeFailed {
                identity_id,
                details,
            } => {
                write!(f, "failed to revoke identity session {identity_id}: {details}")
            }
        }
    }
}

impl std::error::Error for VerifierError {}

/// Errors from the profile store beyond "not found".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileStoreError {
    /// The store could not be reached.
    Unavailable { details: String },
    /// The caller is not authorized to read the profile.
    Unauthorized { identity_id: IdentityId },
    /// The stored profile could not be decoded.
    Malformed {
        identity_id: IdentityId,
        details: String,
    },
}

impl fmt::Display for ProfileStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { details } => write!(f, "profile store unavailable: {details}"),
            Self::Unauthorized { identity_id } => {
                write!(f, "not authorized to read profile {identity_id}")
            }
            Self::Malformed {
                identity_id,
                details,
            } => write!(f, "malformed profile {identity_id}: {details}"),
        }
    }
}

impl std::error::Error for ProfileStoreError {}

/// Errors from writing or clearing the persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    /// The session could not be serialized.
    Serialization { details: String },
    /// The storage medium rejected the operation.
    Io { key: String, details: String },
    /// The storage key is not usable.
    InvalidKey { key: String, reason: String },
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization { details } => {
                write!(f, "failed to serialize session: {details}")
            }
            Self::Io { key, details } => {
                write!(f, "session storage '{key}' failed: {details}")
            }
            Self::InvalidKey { key, reason } => {
                write!(f, "invalid storage key '{key}': {reason}")
            }
        }
    }
}

impl std::error::Error for SessionStoreError {}

/// Errors from provisioning profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    /// The membership window ends before it starts.
    InvertedWindow { start: String, end: String },
}

impl fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvertedWindow { start, end } => {
                write!(f, "membership window ends ({end}) before it starts ({start})")
            }
        }
    }
}

impl std::error::Error for ProvisioningError {}

/// Errors from route guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No session is present.
    NotAuthenticated,
    /// The session does not carry the admin role.
    AdminRequired { identity_id: IdentityId },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "user is not authenticated"),
            Self::AdminRequired { identity_id } => {
                write!(f, "user {identity_id} lacks admin access")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}
