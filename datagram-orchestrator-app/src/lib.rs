//! Platform-agnostic application bootstrap for Datagram Orchestrator.
//!
//! Provides `AppState` (service container and command surface), `AppStateBuilder`
//! (adapter injection) and `StoragePaths` (on-disk layout of a data root).

pub mod adapters;
pub mod paths;

use std::sync::Arc;

use datagram_orchestrator_core::error::{CoreError, CoreResult};
use datagram_orchestrator_core::services::{
    BatchOrchestrator, CacheService, ConfigService, CredentialService, ServiceContext,
    TokenValidator, WorkflowService,
};
use datagram_orchestrator_core::traits::{
    AccountRepository, ActivityLog, ClientFactory, ConfigRepository, CredentialStore,
    GithubClientFactory, LogLines, OperationCache,
};
use datagram_orchestrator_core::types::{
    ApiKeyStatus, BatchOptions, BatchResult, CacheScope, CacheSummary, CancellationFlag,
    ConfigView, CredentialKind, MaskedCredential, OperationKind, RepoWorkflowStatus, TargetScope,
    TokenValidation,
};

pub use paths::StoragePaths;

/// Platform-agnostic application state.
///
/// Holds all services and the `ServiceContext`. A frontend constructs this once
/// at startup via `AppStateBuilder` (or `AppState::open` for the file store) and
/// calls the command methods below.
pub struct AppState {
    /// Service context (holds all storage adapters)
    pub ctx: Arc<ServiceContext>,
    pub credential_service: CredentialService,
    pub token_validator: TokenValidator,
    pub batch_orchestrator: BatchOrchestrator,
    pub cache_service: CacheService,
    pub config_service: ConfigService,
    pub workflow_service: WorkflowService,
}

impl AppState {
    /// Open the file store rooted at `paths`, talking to GitHub with `options`.
    #[cfg(feature = "file-store")]
    pub fn open(
        paths: StoragePaths,
        options: datagram_orchestrator_github::ClientOptions,
    ) -> CoreResult<Self> {
        log::info!("Using data root {}", paths.root().display());
        let store = Arc::new(adapters::FileStore::new(paths));
        AppStateBuilder::new()
            .credential_store(store.clone())
            .account_repository(store.clone())
            .operation_cache(store.clone())
            .activity_log(store.clone())
            .config_repository(store)
            .client_factory(Arc::new(GithubClientFactory::new(options)))
            .build()
    }

    // ===== Command surface =====

    /// Import credentials from text, one per line.
    ///
    /// # Returns
    /// Number of non-blank, pattern-valid lines.
    pub async fn import_credentials(&self, kind: CredentialKind, source: &str) -> CoreResult<usize> {
        self.credential_service.import(kind, source).await
    }

    /// Check every stored GitHub token.
    pub async fn validate_tokens(&self, revalidate: bool) -> CoreResult<Vec<TokenValidation>> {
        self.token_validator.validate_all(revalidate).await
    }

    /// Run one batch operation. Per-account failures are part of the result.
    pub async fn run_batch_operation(
        &self,
        kind: OperationKind,
        options: BatchOptions,
        cancel: &CancellationFlag,
    ) -> CoreResult<BatchResult> {
        self.batch_orchestrator.run(kind, options, cancel).await
    }

    /// Remove cache files. Does nothing unless `confirmed`.
    ///
    /// # Returns
    /// Number of files removed.
    pub async fn clean_cache(&self, confirmed: bool, scope: CacheScope) -> CoreResult<usize> {
        self.cache_service.clean(confirmed, scope).await
    }

    /// Activity log lines, oldest first, read lazily.
    pub async fn logs(&self) -> CoreResult<LogLines> {
        self.ctx.activity_log().lines().await
    }

    // ===== Configuration and status =====

    pub async fn initialize_configuration(
        &self,
        username: &str,
        repo_name: &str,
        token: &str,
    ) -> CoreResult<ConfigView> {
        let config = self
            .config_service
            .initialize(username, repo_name, token)
            .await?;
        Ok(ConfigView::from(&config))
    }

    /// Saved configuration with the main token masked.
    pub async fn configuration(&self) -> CoreResult<ConfigView> {
        Ok(ConfigView::from(&self.config_service.get().await?))
    }

    pub async fn masked_credentials(
        &self,
        kind: CredentialKind,
    ) -> CoreResult<Vec<MaskedCredential>> {
        self.credential_service.masked(kind).await
    }

    pub async fn api_key_status(&self) -> CoreResult<ApiKeyStatus> {
        self.credential_service.api_key_status().await
    }

    pub async fn cache_summary(&self) -> CoreResult<CacheSummary> {
        self.cache_service.summary().await
    }

    /// Latest workflow runs of every repository in `scope`.
    pub async fn workflow_status(&self, scope: TargetScope) -> CoreResult<Vec<RepoWorkflowStatus>> {
        self.workflow_service.status(scope).await
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `credential_store`: API keys and GitHub tokens
/// - `account_repository`: validated accounts (token cache)
/// - `operation_cache`: per-account operation outcomes
/// - `activity_log`: human-readable audit trail
/// - `config_repository`: main account and repository settings
///
/// # Optional
/// - `client_factory`: defaults to `GithubClientFactory` against api.github.com
#[derive(Default)]
pub struct AppStateBuilder {
    credential_store: Option<Arc<dyn CredentialStore>>,
    account_repository: Option<Arc<dyn AccountRepository>>,
    operation_cache: Option<Arc<dyn OperationCache>>,
    activity_log: Option<Arc<dyn ActivityLog>>,
    config_repository: Option<Arc<dyn ConfigRepository>>,
    client_factory: Option<Arc<dyn ClientFactory>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    #[must_use]
    pub fn account_repository(mut self, repo: Arc<dyn AccountRepository>) -> Self {
        self.account_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn operation_cache(mut self, cache: Arc<dyn OperationCache>) -> Self {
        self.operation_cache = Some(cache);
        self
    }

    #[must_use]
    pub fn activity_log(mut self, log: Arc<dyn ActivityLog>) -> Self {
        self.activity_log = Some(log);
        self
    }

    #[must_use]
    pub fn config_repository(mut self, repo: Arc<dyn ConfigRepository>) -> Self {
        self.config_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.client_factory = Some(factory);
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing.
    pub fn build(self) -> CoreResult<AppState> {
        let credential_store = required(self.credential_store, "credential_store")?;
        let account_repository = required(self.account_repository, "account_repository")?;
        let operation_cache = required(self.operation_cache, "operation_cache")?;
        let activity_log = required(self.activity_log, "activity_log")?;
        let config_repository = required(self.config_repository, "config_repository")?;
        let client_factory = self
            .client_factory
            .unwrap_or_else(|| Arc::new(GithubClientFactory::default()));

        let ctx = Arc::new(ServiceContext::new(
            credential_store,
            account_repository,
            operation_cache,
            activity_log,
            config_repository,
            client_factory,
        ));

        Ok(AppState {
            credential_service: CredentialService::new(Arc::clone(&ctx)),
            token_validator: TokenValidator::new(Arc::clone(&ctx)),
            batch_orchestrator: BatchOrchestrator::new(Arc::clone(&ctx)),
            cache_service: CacheService::new(Arc::clone(&ctx)),
            config_service: ConfigService::new(Arc::clone(&ctx)),
            workflow_service: WorkflowService::new(Arc::clone(&ctx)),
            ctx,
        })
    }
}

fn required<T: ?Sized>(adapter: Option<Arc<T>>, name: &str) -> CoreResult<Arc<T>> {
    adapter.ok_or_else(|| CoreError::ValidationError(format!("{name} is required")))
}
