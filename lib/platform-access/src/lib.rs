//! Login admission and session management for coursehall.
//!
//! This crate provides:
//! - The admission procedure (`AdmissionGate`) deciding whether a credential
//!   proof becomes a session
//! - The contracts it consumes: `IdentityVerifier` and `ProfileStore`
//! - Session persistence behind `SessionStore` (in-memory and file-backed)
//! - Route guards over the current session
//!
//! # Admission Model
//!
//! A login is admitted when the identity provider accepts the credentials,
//! the email is confirmed (or belongs to the configured distinguished
//! account), a profile exists and is active, and, for members, the current
//! time lies within the membership window. Administrators are never bound by
//! a membership window.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use coursehall_core::IdentityId;
//! use coursehall_platform_access::{MembershipWindow, Profile, Role, Session, guard};
//!
//! let window = MembershipWindow::new(
//!     Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
//! )
//! .unwrap();
//! let profile = Profile::member(IdentityId::new("abc123"), window);
//! let session = Session::new(profile, "alice@example.com");
//!
//! assert_eq!(session.role(), Role::User);
//! assert!(guard::require_session(Some(&session)).is_ok());
//! assert!(guard::require_admin(Some(&session)).is_err());
//! ```

pub mod admission;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod policy;
pub mod profile;
pub mod role;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use admission::AdmissionGate;
pub use config::{AdmissionConfig, SessionConfig};
pub use error::{
    AuthorizationError, DenialReason, ProfileStoreError, ProvisioningError, SessionStoreError,
    VerifierError,
};
pub use identity::{Identity, IdentityLease, IdentityVerifier, Verification};
pub use policy::{Clock, SystemClock};
pub use profile::{MembershipWindow, Profile, ProfileStore};
pub use role::{AccountStatus, Role, UnknownVariant};
pub use session::{Session, StorageKey};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
