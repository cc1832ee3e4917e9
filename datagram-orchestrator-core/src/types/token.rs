//! Token validation types

use serde::{Deserialize, Serialize};

use crate::error::GithubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStatus {
    Valid,
    InvalidExpired,
    InvalidRevoked,
    RateLimited,
    NetworkError,
}

impl TokenStatus {
    /// Classifies a failed `GET /user`.
    ///
    /// Anything that is neither an auth refusal nor a rate limit means the token
    /// could not be checked, and is reported as a network error.
    #[must_use]
    pub fn from_error(err: &GithubError) -> Self {
        match err {
            GithubError::TokenExpired { .. } => Self::InvalidExpired,
            GithubError::InvalidCredentials { .. } | GithubError::PermissionDenied { .. } => {
                Self::InvalidRevoked
            }
            GithubError::RateLimited { .. } => Self::RateLimited,
            _ => Self::NetworkError,
        }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::InvalidExpired => "invalid-expired",
            Self::InvalidRevoked => "invalid-revoked",
            Self::RateLimited => "rate-limited",
            Self::NetworkError => "network-error",
        }
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation result for one stored token, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenValidation {
    /// Token fingerprint
    pub identifier: String,
    pub masked: String,
    pub status: TokenStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    /// Answered from the token cache without a remote call
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
