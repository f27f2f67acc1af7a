//! Per-identity profile rows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Identity;

/// Username used when the identity has no email.
pub const FALLBACK_USERNAME: &str = "user";

/// A row of the `profiles` table. `id` is the owning identity's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Row inserted the first time an identity reaches the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
}

impl NewProfile {
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            username: default_username(identity.email.as_deref()),
            full_name: String::new(),
        }
    }
}

/// Local part of the email (possibly empty), or [`FALLBACK_USERNAME`] when
/// there is no email.
pub fn default_username(email: Option<&str>) -> String {
    match email {
        Some(email) => email.split('@').next().unwrap_or(email).to_string(),
        None => FALLBACK_USERNAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_username_uses_local_part() {
        assert_eq!(default_username(Some("a@x.com")), "a");
        assert_eq!(default_username(Some("jane.doe@example.org")), "jane.doe");
    }

    #[test]
    fn test_default_username_without_email() {
        assert_eq!(default_username(None), "user");
    }

    #[test]
    fn test_default_username_keeps_empty_local_part() {
        assert_eq!(default_username(Some("@x.com")), "");
        assert_eq!(default_username(Some("")), "");
    }

    #[test]
    fn test_default_username_without_at_sign() {
        assert_eq!(default_username(Some("plainname")), "plainname");
    }

    #[test]
    fn test_new_profile_has_blank_full_name() {
        let identity = Identity::new(Uuid::new_v4(), Some("a@x.com".to_string()));
        let profile = NewProfile::for_identity(&identity);
        assert_eq!(profile.id, identity.id);
        assert_eq!(profile.username, "a");
        assert_eq!(profile.full_name, "");
    }
}
