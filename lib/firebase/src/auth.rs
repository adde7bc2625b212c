//! Identity toolkit wire types.

use serde::{Deserialize, Serialize};

/// Error messages the identity toolkit uses for refused credentials.
///
/// All of them map to a plain rejection so that callers cannot tell an
/// unknown account from a wrong password.
const REJECTION_CODES: &[&str] = &[
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_EMAIL",
    "MISSING_PASSWORD",
    "MISSING_EMAIL",
    "USER_DISABLED",
];

/// Body of `accounts:signInWithPassword`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub return_secure_token: bool,
}

/// Successful `accounts:signInWithPassword` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub local_id: String,
    #[serde(default)]
    pub email: String,
    pub id_token: String,
}

/// Body of `accounts:lookup`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest<'a> {
    pub id_token: &'a str,
}

/// Successful `accounts:lookup` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub users: Vec<LookupUser>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupUser {
    pub local_id: String,
    #[serde(default)]
    pub email_verified: bool,
}

/// Error envelope shared by the Google REST APIs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

impl ErrorEnvelope {
    /// Parses an error body, falling back to an empty envelope.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Returns the leading error code of the message.
    ///
    /// Messages may carry detail after the code, as in
    /// `"TOO_MANY_ATTEMPTS_TRY_LATER : Access temporarily disabled"`.
    #[must_use]
    pub fn code(&self) -> &str {
        self.error
            .message
            .split([' ', ':'])
            .next()
            .unwrap_or_default()
    }

    /// True if the error means the credentials were refused.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        REJECTION_CODES.contains(&self.code())
    }
}
