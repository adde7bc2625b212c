//! Pure admission checks.
//!
//! These functions hold the rules of the admission procedure without any I/O.
//! The procedure calls them in order; each returns the first denial it finds.

use chrono::{DateTime, Utc};

use crate::config::AdmissionConfig;
use crate::error::DenialReason;
use crate::identity::Identity;
use crate::profile::Profile;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Checks the identity-level gate.
///
/// Unconfirmed identities are refused unless their email is exactly the
/// configured distinguished email.
///
/// # Errors
///
/// Returns `DenialReason::EmailNotVerified` if the gate refuses.
pub fn check_identity(identity: &Identity, config: &AdmissionConfig) -> Result<(), DenialReason> {
    if !identity.email_confirmed && !config.is_distinguished(&identity.email) {
        return Err(DenialReason::EmailNotVerified);
    }
    Ok(())
}

/// Checks a profile's status and, for non-admins, its membership window.
///
/// # Errors
///
/// Returns `AccountInactive`, `MembershipDatesMissing` or
/// `MembershipNotActive`, checked in that order.
pub fn check_profile(profile: &Profile, now: DateTime<Utc>) -> Result<(), DenialReason> {
    if !profile.status().is_active() {
        return Err(DenialReason::AccountInactive);
    }

    if profile.is_admin() {
        return Ok(());
    }

    let (Some(start), Some(end)) = (profile.membership_start(), profile.membership_end()) else {
        return Err(DenialReason::MembershipDatesMissing);
    };

    if now < start || now > end {
        return Err(DenialReason::MembershipNotActive);
    }

    Ok(())
}
