//! Membership profile and its store.
//!
//! A profile is the application's record for an identity: role, status and,
//! for members, the window during which they may log in. Profiles are keyed
//! by the identity id they belong to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coursehall_core::IdentityId;
use rootcause::Report;
use serde::{Deserialize, Serialize};

use crate::error::{ProfileStoreError, ProvisioningError};
use crate::role::{AccountStatus, Role};

/// The inclusive `[start, end]` range during which a member may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl MembershipWindow {
    /// Creates a window, rejecting one that ends before it starts.
    ///
    /// # Errors
    ///
    /// Returns `ProvisioningError::InvertedWindow` if `end < start`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, Report<ProvisioningError>> {
        if end < start {
            return Err(ProvisioningError::InvertedWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            }
            .into());
        }
        Ok(Self { start, end })
    }

    /// Returns when the window opens.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns when the window closes.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if `now` lies within the window. Both ends are inclusive.
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        !(now < self.start || now > self.end)
    }
}

/// Stored membership profile for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same value as the identity id.
    id: IdentityId,
    role: Role,
    status: AccountStatus,
    /// Only meaningful for `Role::User`.
    membership_start: Option<DateTime<Utc>>,
    /// Only meaningful for `Role::User`.
    membership_end: Option<DateTime<Utc>>,
}

impl Profile {
    /// Creates an active administrator profile.
    #[must_use]
    pub fn admin(id: IdentityId) -> Self {
        Self {
            id,
            role: Role::Admin,
            status: AccountStatus::Active,
            membership_start: None,
            membership_end: None,
        }
    }

    /// Creates an active member profile with its membership window.
    ///
    /// Provisioning must use this constructor for members so that a member
    /// profile never exists without both dates.
    #[must_use]
    pub fn member(id: IdentityId, window: MembershipWindow) -> Self {
        Self {
            id,
            role: Role::User,
            status: AccountStatus::Active,
            membership_start: Some(window.start()),
            membership_end: Some(window.end()),
        }
    }

    /// Creates a profile with all fields specified.
    ///
    /// Use this when reconstituting a profile from storage, where the dates
    /// may legitimately be missing.
    #[must_use]
    pub fn with_all_fields(
        id: IdentityId,
        role: Role,
        status: AccountStatus,
        membership_start: Option<DateTime<Utc>>,
        membership_end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            role,
            status,
            membership_start,
            membership_end,
        }
    }

    /// Returns the identity id this profile belongs to.
    #[must_use]
    pub fn id(&self) -> &IdentityId {
        &self.id
    }

    /// Returns the profile's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the account status.
    #[must_use]
    pub fn status(&self) -> AccountStatus {
        self.status
    }

    /// Returns the membership start, if set.
    #[must_use]
    pub fn membership_start(&self) -> Option<DateTime<Utc>> {
        self.membership_start
    }

    /// Returns the membership end, if set.
    #[must_use]
    pub fn membership_end(&self) -> Option<DateTime<Utc>> {
        self.membership_end
    }

    /// Returns the membership window if both dates are set.
    ///
    /// Stored dates are not re-validated here: an inverted stored window is
    /// returned as-is and simply contains no instant.
    #[must_use]
    pub fn membership_window(&self) -> Option<MembershipWindow> {
        match (self.membership_start, self.membership_end) {
            (Some(start), Some(end)) => Some(MembershipWindow { start, end }),
            _ => None,
        }
    }

    /// Returns true if the profile carries the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Sets the account status.
    pub fn set_status(&mut self, status: AccountStatus) {
        self.status = status;
    }

    /// Sets the role. Membership dates are kept; admins ignore them.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    /// Replaces the membership window.
    pub fn set_membership(&mut self, window: MembershipWindow) {
        self.membership_start = Some(window.start());
        self.membership_end = Some(window.end());
    }
}

/// Trait for looking up profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns the profile for an identity, or `None` if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for faults beyond "not found", such as an
    /// unreachable store or an undecodable document.
    async fn get_profile(
        &self,
        id: &IdentityId,
    ) -> Result<Option<Profile>, Report<ProfileStoreError>>;
}
