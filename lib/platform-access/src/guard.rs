//! Route guards over the current session.
//!
//! Pages that need a logged-in user, or an administrator, check the restored
//! session with these functions before rendering.

use rootcause::Report;

use crate::error::AuthorizationError;
use crate::session::Session;

/// Requires a session to be present.
///
/// # Errors
///
/// Returns `AuthorizationError::NotAuthenticated` if `session` is `None`.
pub fn require_session(session: Option<&Session>) -> Result<&Session, Report<AuthorizationError>> {
    session.ok_or_else(|| AuthorizationError::NotAuthenticated.into())
}

/// Requires an administrator session.
///
/// # Errors
///
/// Returns `NotAuthenticated` without a session and `AdminRequired` for a
/// member session.
pub fn require_admin(session: Option<&Session>) -> Result<&Session, Report<AuthorizationError>> {
    let session = require_session(session)?;
    if !session.is_admin() {
        return Err(AuthorizationError::AdminRequired {
            identity_id: session.identity_id().clone(),
        }
        .into());
    }
    Ok(session)
}
