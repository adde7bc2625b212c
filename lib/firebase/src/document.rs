//! Decoding of Firestore profile documents.
//!
//! Firestore's REST API wraps every field in a typed value object such as
//! `{"stringValue": "admin"}` or `{"timestampValue": "2024-01-01T00:00:00Z"}`.

use chrono::{DateTime, Utc};
use coursehall_core::IdentityId;
use coursehall_platform_access::{AccountStatus, Profile, ProfileStoreError, Role};
use rootcause::Report;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

const ROLE_FIELD: &str = "role";
const STATUS_FIELD: &str = "status";
const MEMBERSHIP_START_FIELD: &str = "membershipStart";
const MEMBERSHIP_END_FIELD: &str = "membershipEnd";

/// A Firestore document as returned by `documents.get`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    /// Full resource name of the document.
    #[serde(default)]
    pub name: String,
    /// Typed field values keyed by field name.
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl Document {
    /// Decodes this document into the profile of `id`.
    ///
    /// # Errors
    ///
    /// Returns `ProfileStoreError::Malformed` if role or status is missing or
    /// unknown, or a membership date is not a valid timestamp.
    pub fn into_profile(self, id: &IdentityId) -> Result<Profile, Report<ProfileStoreError>> {
        let malformed = |details: String| -> Report<ProfileStoreError> {
            ProfileStoreError::Malformed {
                identity_id: id.clone(),
                details,
            }
            .into()
        };

        let role: Role = self
            .string_field(ROLE_FIELD)
            .ok_or_else(|| malformed(format!("missing field '{ROLE_FIELD}'")))?
            .parse()
            .map_err(|e| malformed(format!("{e}")))?;
        let status: AccountStatus = self
            .string_field(STATUS_FIELD)
            .ok_or_else(|| malformed(format!("missing field '{STATUS_FIELD}'")))?
            .parse()
            .map_err(|e| malformed(format!("{e}")))?;

        let membership_start = self
            .timestamp_field(MEMBERSHIP_START_FIELD)
            .map_err(&malformed)?;
        let membership_end = self
            .timestamp_field(MEMBERSHIP_END_FIELD)
            .map_err(&malformed)?;

        Ok(Profile::with_all_fields(
            id.clone(),
            role,
            status,
            membership_start,
            membership_end,
        ))
    }

    fn string_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|value| value.get("stringValue"))
            .and_then(Value::as_str)
    }

    /// Reads an optional date. Absent and null fields are `None`.
    fn timestamp_field(&self, name: &str) -> Result<Option<DateTime<Utc>>, String> {
        let Some(value) = self.fields.get(name) else {
            return Ok(None);
        };
        if value.get("nullValue").is_some() {
            return Ok(None);
        }

        let raw = value
            .get("timestampValue")
            .or_else(|| value.get("stringValue"))
            .and_then(Value::as_str)
            .ok_or_else(|| format!("field '{name}' is not a timestamp"))?;

        DateTime::parse_from_rfc3339(raw)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|e| format!("field '{name}' has invalid timestamp '{raw}': {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn document(fields: Value) -> Document {
        serde_json::from_value(json!({
            "name": "projects/demo/databases/(default)/documents/users/u1",
            "fields": fields,
        }))
        .expect("document")
    }

    #[test]
    fn decodes_member_profile() {
        let doc = document(json!({
            "role": { "stringValue": "user" },
            "status": { "stringValue": "active" },
            "membershipStart": { "timestampValue": "2024-01-01T00:00:00Z" },
            "membershipEnd": { "timestampValue": "2024-12-31T00:00:00.000000Z" },
        }));

        let profile = doc.into_profile(&IdentityId::new("u1")).expect("profile");

        assert_eq!(profile.id().as_str(), "u1");
        assert_eq!(profile.role(), Role::User);
        assert_eq!(profile.status(), AccountStatus::Active);
        assert_eq!(
            profile.membership_start(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            profile.membership_end(),
            Some(Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn string_dates_and_offsets_are_accepted() {
        let doc = document(json!({
            "role": { "stringValue": "user" },
            "status": { "stringValue": "paused" },
            "membershipStart": { "stringValue": "2024-01-01T02:00:00+02:00" },
        }));

        let profile = doc.into_profile(&IdentityId::new("u1")).expect("profile");

        assert_eq!(profile.status(), AccountStatus::Paused);
        assert_eq!(
            profile.membership_start(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(profile.membership_end(), None);
    }

    #[test]
    fn admin_without_dates_decodes() {
        let doc = document(json!({
            "role": { "stringValue": "admin" },
            "status": { "stringValue": "active" },
            "membershipEnd": { "nullValue": null },
        }));

        let profile = doc.into_profile(&IdentityId::new("a1")).expect("profile");

        assert!(profile.is_admin());
        assert_eq!(profile.membership_window(), None);
    }

    #[test]
    fn unknown_status_is_malformed() {
        let doc = document(json!({
            "role": { "stringValue": "user" },
            "status": { "stringValue": "banned" },
        }));

        let report = doc
            .into_profile(&IdentityId::new("u1"))
            .expect_err("should fail");
        assert!(report.to_string().contains("unknown status 'banned'"));
    }

    #[test]
    fn missing_role_is_malformed() {
        let doc = document(json!({ "status": { "stringValue": "active" } }));
        let report = doc
            .into_profile(&IdentityId::new("u1"))
            .expect_err("should fail");
        assert!(report.to_string().contains("missing field 'role'"));
    }

    #[test]
    fn invalid_timestamp_is_malformed() {
        let doc = document(json!({
            "role": { "stringValue": "user" },
            "status": { "stringValue": "active" },
            "membershipStart": { "stringValue": "next tuesday" },
        }));
        assert!(doc.into_profile(&IdentityId::new("u1")).is_err());

        let doc = document(json!({
            "role": { "stringValue": "user" },
            "status": { "stringValue": "active" },
            "membershipEnd": { "integerValue": "1704067200" },
        }));
        assert!(doc.into_profile(&IdentityId::new("u1")).is_err());
    }
}
