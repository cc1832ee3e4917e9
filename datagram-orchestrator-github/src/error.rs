use serde::{Deserialize, Serialize};

/// Coarse classification of a failed remote call.
///
/// Callers decide what to do with a failure from its class alone:
/// - [`Auth`](Self::Auth) is fatal for the credential and never retried
/// - [`RateLimited`](Self::RateLimited) and [`TransientNetwork`](Self::TransientNetwork) are retried
/// - [`RemoteRejected`](Self::RemoteRejected) is reported and never retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureClass {
    #[serde(rename = "auth-error")]
    Auth,
    RateLimited,
    TransientNetwork,
    RemoteRejected,
}

impl FailureClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth-error",
            Self::RateLimited => "rate-limited",
            Self::TransientNetwork => "transient-network",
            Self::RemoteRejected => "remote-rejected",
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for every GitHub API operation.
///
/// All variants are serializable for structured error reporting.
///
/// # Retryable Errors
///
/// The following variants represent transient failures that may succeed on retry:
/// - [`NetworkError`](Self::NetworkError): connection failures and 5xx gateway errors
/// - [`Timeout`](Self::Timeout): request timed out
/// - [`RateLimited`](Self::RateLimited): primary or secondary rate limit hit
///
/// The built-in HTTP client retries these according to its [`RetryPolicy`](crate::RetryPolicy).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum GithubError {
    /// A network-level error occurred (DNS resolution failure, connection refused, HTTP 5xx).
    NetworkError {
        /// Error details.
        detail: String,
    },

    /// The HTTP request timed out.
    Timeout {
        /// Error details.
        detail: String,
    },

    /// The API rate limit has been exceeded (HTTP 429, or 403 with an exhausted quota).
    RateLimited {
        /// Suggested wait time in seconds, from `Retry-After` or `x-ratelimit-reset`.
        retry_after: Option<u64>,
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The token was rejected (HTTP 401): revoked, malformed, or never valid.
    InvalidCredentials {
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The token was rejected because it has expired.
    TokenExpired {
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The token is valid but lacks the permission or scope for this call.
    PermissionDenied {
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The repository, user, invitation or secret does not exist (or is invisible to this token).
    NotFound {
        /// What was being looked up.
        resource: String,
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The request was understood but refused (HTTP 409/422).
    ValidationFailed {
        /// Original error message from the API.
        raw_message: String,
    },

    /// Failed to parse the API response.
    ParseError {
        /// Details about the parse failure.
        detail: String,
    },

    /// Failed to serialize a request body.
    SerializationError {
        /// Details about the serialization failure.
        detail: String,
    },

    /// Failed to seal a secret with the repository public key.
    EncryptionError {
        /// Details about the encryption failure.
        detail: String,
    },

    /// An unrecognized error response.
    Unknown {
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Raw error message.
        raw_message: String,
    },
}

impl GithubError {
    /// Whether this is expected behaviour (bad input, missing resource, etc.), used for log levels.
    ///
    /// `true` should log at `warn`, `false` at `error`.
    /// **Update this method when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials { .. }
                | Self::TokenExpired { .. }
                | Self::PermissionDenied { .. }
                | Self::NotFound { .. }
                | Self::ValidationFailed { .. }
                | Self::RateLimited { .. }
        )
    }

    /// Failure class of this error.
    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::InvalidCredentials { .. }
            | Self::TokenExpired { .. }
            | Self::PermissionDenied { .. } => FailureClass::Auth,
            Self::RateLimited { .. } => FailureClass::RateLimited,
            Self::NetworkError { .. } | Self::Timeout { .. } => FailureClass::TransientNetwork,
            Self::NotFound { .. }
            | Self::ValidationFailed { .. }
            | Self::ParseError { .. }
            | Self::SerializationError { .. }
            | Self::EncryptionError { .. }
            | Self::Unknown { .. } => FailureClass::RemoteRejected,
        }
    }

    /// Whether the HTTP client may retry the call that produced this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.class(),
            FailureClass::RateLimited | FailureClass::TransientNetwork
        )
    }
}

impl std::fmt::Display for GithubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { detail } => write!(f, "Network error: {detail}"),
            Self::Timeout { detail } => write!(f, "Request timeout: {detail}"),
            Self::RateLimited { retry_after, .. } => {
                if let Some(secs) = retry_after {
                    write!(f, "Rate limited (retry after {secs}s)")
                } else {
                    write!(f, "Rate limited")
                }
            }
            Self::InvalidCredentials { raw_message } => {
                if let Some(msg) = raw_message {
                    write!(f, "Invalid credentials: {msg}")
                } else {
                    write!(f, "Invalid credentials")
                }
            }
            Self::TokenExpired { .. } => write!(f, "Token expired"),
            Self::PermissionDenied { raw_message } => {
                if let Some(msg) = raw_message {
                    write!(f, "Permission denied: {msg}")
                } else {
                    write!(f, "Permission denied")
                }
            }
            Self::NotFound { resource, .. } => write!(f, "'{resource}' not found"),
            Self::ValidationFailed { raw_message } => write!(f, "Rejected: {raw_message}"),
            Self::ParseError { detail } => write!(f, "Parse error: {detail}"),
            Self::SerializationError { detail } => write!(f, "Serialization error: {detail}"),
            Self::EncryptionError { detail } => write!(f, "Encryption error: {detail}"),
            Self::Unknown {
                status: Some(status),
                raw_message,
            } => write!(f, "HTTP {status}: {raw_message}"),
            Self::Unknown {
                status: None,
                raw_message,
            } => f.write_str(raw_message),
        }
    }
}

impl std::error::Error for GithubError {}

/// Convenience type alias for `Result<T, GithubError>`.
pub type Result<T> = std::result::Result<T, GithubError>;
