//! Type definitions

mod account;
mod batch;
mod cache;
mod config;
mod credential;
mod operation;
mod response;
mod token;
mod workflow;

pub use account::Account;
pub use batch::{
    AccountReport, BatchOptions, BatchResult, CancellationFlag, TargetScope,
    DEFAULT_COMPLETION_TIMEOUT, DEFAULT_POLL_INTERVAL,
};
pub use cache::{CacheScope, CacheSummary, OperationCacheSummary};
pub use config::{
    ConfigView, OrchestratorConfig, DEFAULT_BILLING_THRESHOLD_MINUTES, DEFAULT_REQUEST_DELAY_MS,
    DEFAULT_SECRET_NAME, DEFAULT_WORKFLOW_FILE, DEFAULT_WORKFLOW_REF,
};
pub use credential::{
    ApiKeyStatus, Credential, CredentialKind, MaskedCredential, ParsedCredentials,
    API_KEY_MIN_EXCLUSIVE_LEN, TOKEN_PREFIXES,
};
pub use operation::{CompletionIndex, OperationKind, OperationRecord, OperationState, Outcome};
pub use response::CommandResult;
pub use token::{TokenStatus, TokenValidation};
pub use workflow::RepoWorkflowStatus;

// Re-export GitHub library types used in the public API
pub use datagram_orchestrator_github::{FailureClass, RepoRef, WorkflowRun};
