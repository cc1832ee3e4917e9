//! Business logic service layer

mod batch_orchestrator;
mod cache_service;
mod config_service;
mod credential_service;
mod operation_executor;
mod token_validator;
mod workflow_service;

pub use batch_orchestrator::BatchOrchestrator;
pub use cache_service::CacheService;
pub use config_service::ConfigService;
pub use credential_service::CredentialService;
pub use operation_executor::{OperationExecutor, StepOutcome};
pub use token_validator::TokenValidator;
pub use workflow_service::WorkflowService;

use std::sync::Arc;

use datagram_orchestrator_github::GithubApi;

use crate::error::{CoreError, CoreResult};
use crate::traits::{
    AccountRepository, ActivityLog, ClientFactory, ConfigRepository, CredentialStore,
    OperationCache,
};
use crate::types::OrchestratorConfig;

/// Service context - holds all dependencies
///
/// The platform layer creates this context and injects its storage implementations.
pub struct ServiceContext {
    credential_store: Arc<dyn CredentialStore>,
    account_repository: Arc<dyn AccountRepository>,
    operation_cache: Arc<dyn OperationCache>,
    activity_log: Arc<dyn ActivityLog>,
    config_repository: Arc<dyn ConfigRepository>,
    client_factory: Arc<dyn ClientFactory>,
}

impl ServiceContext {
    #[must_use]
    pub fn new(
        credential_store: Arc<dyn CredentialStore>,
        account_repository: Arc<dyn AccountRepository>,
        operation_cache: Arc<dyn OperationCache>,
        activity_log: Arc<dyn ActivityLog>,
        config_repository: Arc<dyn ConfigRepository>,
        client_factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            credential_store,
            account_repository,
            operation_cache,
            activity_log,
            config_repository,
            client_factory,
        }
    }

    #[must_use]
    pub fn credential_store(&self) -> &dyn CredentialStore {
        self.credential_store.as_ref()
    }

    #[must_use]
    pub fn account_repository(&self) -> &dyn AccountRepository {
        self.account_repository.as_ref()
    }

    #[must_use]
    pub fn operation_cache(&self) -> &dyn OperationCache {
        self.operation_cache.as_ref()
    }

    #[must_use]
    pub fn activity_log(&self) -> &dyn ActivityLog {
        self.activity_log.as_ref()
    }

    #[must_use]
    pub fn config_repository(&self) -> &dyn ConfigRepository {
        self.config_repository.as_ref()
    }

    /// Get a GitHub client acting as the owner of `token`
    pub async fn client_for(&self, token: &str) -> CoreResult<Arc<dyn GithubApi>> {
        self.client_factory.client_for(token).await
    }

    /// Load the configuration, failing when `init` has never run
    pub async fn require_config(&self) -> CoreResult<OrchestratorConfig> {
        self.config_repository.load().await?.ok_or_else(|| {
            CoreError::ConfigurationMissing(
                "orchestrator is not initialized, run `init` first".to_string(),
            )
        })
    }

    /// Append to the activity log
    ///
    /// The activity log is an audit trail; a failed append is logged and never fails the caller.
    pub async fn record_activity(&self, message: &str) {
        if let Err(e) = self.activity_log.append(message).await {
            log::warn!("Failed to append to activity log: {e}");
        }
    }
}
