//! Account model

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("Invalid regex")
});

/// The account the local log is synchronized under
///
/// `email` is the cross-replica join key; there is no separate device or
/// session identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    /// Last successful push, `None` until the first one
    pub synced_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a never-synced account after validating the email
    pub fn new(email: &str) -> Result<Self> {
        Ok(Self {
            email: normalize_email(email)?,
            synced_at: None,
        })
    }
}

/// Trim and validate an email address.
///
/// # Examples
///
/// ```
/// use shiftlog_core::models::normalize_email;
///
/// assert_eq!(normalize_email(" moe@example.com ").unwrap(), "moe@example.com");
/// assert!(normalize_email("not-an-email").is_err());
/// ```
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    if EMAIL_PATTERN.is_match(email) {
        Ok(email.to_string())
    } else {
        Err(Error::Validation(format!("invalid email address: {email:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_new_starts_unsynced() {
        let account = Account::new("worker@example.com").unwrap();
        assert_eq!(account.email, "worker@example.com");
        assert!(account.synced_at.is_none());
    }

    #[test]
    fn test_normalize_email_rejects_malformed() {
        for raw in [
            "",
            "   ",
            "worker",
            "worker@",
            "@example.com",
            "a b@example.com",
            "worker@example",
        ] {
            assert!(
                matches!(normalize_email(raw), Err(Error::Validation(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_normalize_email_accepts_subdomains() {
        assert_eq!(
            normalize_email("shift.worker+tag@mail.example.co.uk").unwrap(),
            "shift.worker+tag@mail.example.co.uk"
        );
    }
}
