//! Datagram Orchestrator Core Library
//!
//! Coordinates many GitHub accounts around one repository:
//! - Credential import and masked display (`CredentialService`)
//! - Token validation (`TokenValidator`)
//! - Idempotent batch operations with an operation cache (`BatchOrchestrator`)
//! - Cache maintenance and workflow status (`CacheService`, `WorkflowService`)
//!
//! Storage is abstracted behind traits so the same services run on files in
//! production and on in-memory mocks in tests.

pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use services::ServiceContext;
pub use traits::{
    AccountRepository, ActivityLog, ClientFactory, ConfigRepository, CredentialStore,
    GithubClientFactory, LogLines, OperationCache,
};
