//! crates/course_capture_core/src/normalize/profile.rs
//!
//! Finds the signed-in user in whatever shape the payload happens to have.
//!
//! Each profile field has a priority-ordered alias list. The payload is searched
//! level by level (descending through the usual wrapper keys) and the first
//! non-empty value per field wins.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use super::{lookup, text, Touched};
use crate::domain::{EntityKind, UserProfile};
use crate::router::PROFILE_NESTING;
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileField {
    Name,
    FirstName,
    LastName,
    Email,
    UserId,
    InstitutionId,
    InstitutionName,
}

const FIELD_COUNT: usize = 7;

/// One row per `ProfileField`, in declaration order.
const PROFILE_ALIASES: [(ProfileField, &[&str]); FIELD_COUNT] = [
    (
        ProfileField::Name,
        &["name", "fullName", "full_name", "displayName"],
    ),
    (
        ProfileField::FirstName,
        &["firstName", "first_name", "givenName"],
    ),
    (
        ProfileField::LastName,
        &["lastName", "last_name", "familyName", "surname"],
    ),
    (
        ProfileField::Email,
        &["email", "emailAddress", "email_address", "primaryEmail"],
    ),
    (ProfileField::UserId, &["userId", "user_id", "userID"]),
    (
        ProfileField::InstitutionId,
        &["institutionId", "institution_id", "institution.id", "schoolId"],
    ),
    (
        ProfileField::InstitutionName,
        &[
            "institutionName",
            "institution_name",
            "institution.name",
            "schoolName",
        ],
    ),
];

/// Deep enough for `{ data: { result: { user: { profile: {...} } } } }`.
const MAX_DEPTH: usize = 5;

/// Field values collected so far, indexed like `PROFILE_ALIASES`.
#[derive(Debug, Default)]
struct Draft([String; FIELD_COUNT]);

impl Draft {
    fn is_full(&self) -> bool {
        self.0.iter().all(|value| !value.is_empty())
    }

    fn take(&mut self, field: ProfileField) -> String {
        std::mem::take(&mut self.0[field as usize])
    }

    fn fill_from(&mut self, value: &Value, depth: usize) {
        for (slot, (_, aliases)) in self.0.iter_mut().zip(PROFILE_ALIASES.iter()) {
            if slot.is_empty() {
                *slot = text(value, aliases);
            }
        }
        if self.is_full() || depth >= MAX_DEPTH {
            return;
        }
        for wrapper in PROFILE_NESTING {
            if let Some(inner) = lookup(value, wrapper).filter(|inner| inner.is_object()) {
                self.fill_from(inner, depth + 1);
            }
        }
    }

    fn into_profile(mut self) -> UserProfile {
        let first_name = self.take(ProfileField::FirstName);
        let last_name = self.take(ProfileField::LastName);
        let mut name = self.take(ProfileField::Name);
        if name.is_empty() {
            name = [first_name.as_str(), last_name.as_str()]
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
        }

        UserProfile {
            name,
            first_name,
            last_name,
            email: self.take(ProfileField::Email),
            user_id: self.take(ProfileField::UserId),
            institution_id: self.take(ProfileField::InstitutionId),
            institution_name: self.take(ProfileField::InstitutionName),
            captured_at: Some(Utc::now()),
        }
    }
}

/// Extracts the profile without touching the store.
pub fn extract(payload: &Value) -> Option<UserProfile> {
    if !payload.is_object() {
        return None;
    }
    let mut draft = Draft::default();
    draft.fill_from(payload, 0);
    let profile = draft.into_profile();
    profile.is_identified().then_some(profile)
}

pub fn normalize(payload: &Value, store: &mut EntityStore) -> Touched {
    let mut touched = Touched::default();
    match extract(payload) {
        Some(profile) => {
            store.upsert_profile(profile);
            touched.mark(EntityKind::Profile);
        }
        None => debug!("Profile payload carried no name, email or user id"),
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alias_table_follows_field_order() {
        for (position, (field, _)) in PROFILE_ALIASES.iter().enumerate() {
            assert_eq!(*field as usize, position);
        }
    }

    #[test]
    fn finds_fields_through_wrappers() {
        let payload = json!({
            "data": {
                "user": {
                    "given_name_unused": "x",
                    "firstName": "Ada",
                    "last_name": "Lovelace",
                    "emailAddress": "ada@uni.edu",
                    "userId": 42,
                    "institution": { "id": "inst-1", "name": "State University" }
                }
            }
        });
        let profile = extract(&payload).unwrap();
        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.email, "ada@uni.edu");
        assert_eq!(profile.user_id, "42");
        assert_eq!(profile.institution_id, "inst-1");
        assert_eq!(profile.institution_name, "State University");
    }

    #[test]
    fn outer_values_take_priority_over_nested_ones() {
        let payload = json!({
            "email": "outer@uni.edu",
            "profile": { "email": "inner@uni.edu", "displayName": "Inner Name" }
        });
        let profile = extract(&payload).unwrap();
        assert_eq!(profile.email, "outer@uni.edu");
        assert_eq!(profile.name, "Inner Name");
    }

    #[test]
    fn payload_without_identity_is_not_upserted() {
        let mut store = EntityStore::new();
        let touched = normalize(&json!({ "institutionName": "State University" }), &mut store);
        assert!(touched.is_empty());
        assert!(store.profile().is_none());
    }

    #[test]
    fn non_object_payloads_are_ignored() {
        assert!(extract(&json!(["ada@uni.edu"])).is_none());
        assert!(extract(&Value::Null).is_none());
    }

    #[test]
    fn re_ingesting_keeps_one_profile() {
        let mut store = EntityStore::new();
        let payload = json!({ "user": { "email": "ada@uni.edu" } });
        normalize(&payload, &mut store);
        let first = store.profile().cloned();
        normalize(&payload, &mut store);
        assert_eq!(store.profile().cloned(), first);
    }
}
