//! Account types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{fingerprint::fingerprint, mask_secret};

/// A GitHub account whose token has been validated.
///
/// Entries live in the token cache, keyed by the token fingerprint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// GitHub login as reported by `GET /user`
    pub username: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(rename = "validatedAt")]
    #[serde(with = "crate::utils::datetime")]
    pub validated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            scopes: None,
            validated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Option<Vec<String>>) -> Self {
        self.scopes = scopes;
        self
    }

    /// GitHub logins are case-insensitive.
    #[must_use]
    pub fn is(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username)
    }

    #[must_use]
    pub fn token_fingerprint(&self) -> String {
        fingerprint(&self.token)
    }

    #[must_use]
    pub fn masked_token(&self) -> String {
        mask_secret(&self.token)
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("token", &self.masked_token())
            .field("validated_at", &self.validated_at)
            .finish_non_exhaustive()
    }
}
