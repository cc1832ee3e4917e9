//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error types
pub use datagram_orchestrator_github::{FailureClass, GithubError};

/// Core layer error type
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Required configuration or backing file is absent
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Backing data exists but is unreadable or malformed
    #[error("Store corrupt: {0}")]
    StoreCorrupt(String),

    /// Nothing usable survived filtering or validation
    #[error("No valid credentials: {0}")]
    NoValidCredentials(String),

    /// The remote rejected the credential
    #[error("Authentication rejected: {0}")]
    AuthError(String),

    /// Rate limit still in force after retries
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Network failure still present after retries
    #[error("Network error: {0}")]
    TransientNetwork(String),

    /// Non-retryable business error from the remote
    #[error("Remote rejected: {0}")]
    RemoteRejected(String),

    /// Run interrupted by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CoreError {
    /// Whether it is expected behavior (user input, remote refusal, etc.), used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationMissing(_)
                | Self::NoValidCredentials(_)
                | Self::AuthError(_)
                | Self::RateLimited(_)
                | Self::RemoteRejected(_)
                | Self::Cancelled
                | Self::ValidationError(_)
        )
    }

    /// Failure class for per-account errors. `None` for local errors.
    #[must_use]
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Self::AuthError(_) => Some(FailureClass::Auth),
            Self::RateLimited(_) => Some(FailureClass::RateLimited),
            Self::TransientNetwork(_) => Some(FailureClass::TransientNetwork),
            Self::RemoteRejected(_) => Some(FailureClass::RemoteRejected),
            _ => None,
        }
    }

    /// Whether this error must abort a whole batch run instead of being recorded
    /// against a single account.
    #[must_use]
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationMissing(_)
                | Self::StoreCorrupt(_)
                | Self::NoValidCredentials(_)
                | Self::StorageError(_)
                | Self::SerializationError(_)
        )
    }
}

impl From<GithubError> for CoreError {
    fn from(err: GithubError) -> Self {
        let message = err.to_string();
        match err.class() {
            FailureClass::Auth => Self::AuthError(message),
            FailureClass::RateLimited => Self::RateLimited(message),
            FailureClass::TransientNetwork => Self::TransientNetwork(message),
            FailureClass::RemoteRejected => Self::RemoteRejected(message),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
