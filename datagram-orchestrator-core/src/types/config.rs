//! Orchestrator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use datagram_orchestrator_github::RepoRef;

use crate::error::{CoreError, CoreResult};
use crate::utils::mask_secret;

use super::{Account, CredentialKind};

pub const DEFAULT_SECRET_NAME: &str = "DATAGRAM_API_KEYS";
pub const DEFAULT_WORKFLOW_FILE: &str = "datagram-runner.yml";
pub const DEFAULT_WORKFLOW_REF: &str = "main";
/// Included Actions minutes on the free plan, minus a safety margin.
pub const DEFAULT_BILLING_THRESHOLD_MINUTES: f64 = 1800.0;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1500;

fn default_secret_name() -> String {
    DEFAULT_SECRET_NAME.to_string()
}

fn default_workflow_file() -> String {
    DEFAULT_WORKFLOW_FILE.to_string()
}

fn default_workflow_ref() -> String {
    DEFAULT_WORKFLOW_REF.to_string()
}

fn default_billing_threshold() -> f64 {
    DEFAULT_BILLING_THRESHOLD_MINUTES
}

fn default_request_delay_ms() -> u64 {
    DEFAULT_REQUEST_DELAY_MS
}

/// Persisted orchestrator configuration (`config/config.json`).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub main_account_username: String,
    pub main_repo_name: String,
    pub main_token: String,
    #[serde(default = "default_secret_name")]
    pub secret_name: String,
    #[serde(default = "default_workflow_file")]
    pub workflow_file: String,
    #[serde(default = "default_workflow_ref")]
    pub workflow_ref: String,
    #[serde(default = "default_billing_threshold")]
    pub billing_threshold_minutes: f64,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl OrchestratorConfig {
    pub fn new(
        main_account_username: impl Into<String>,
        main_repo_name: impl Into<String>,
        main_token: impl Into<String>,
    ) -> Self {
        Self {
            main_account_username: main_account_username.into(),
            main_repo_name: main_repo_name.into(),
            main_token: main_token.into(),
            secret_name: default_secret_name(),
            workflow_file: default_workflow_file(),
            workflow_ref: default_workflow_ref(),
            billing_threshold_minutes: default_billing_threshold(),
            request_delay_ms: default_request_delay_ms(),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.main_account_username.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "main account username is empty".into(),
            ));
        }
        if !is_valid_repo_name(&self.main_repo_name) {
            return Err(CoreError::ValidationError(format!(
                "invalid repository name: {}",
                self.main_repo_name
            )));
        }
        if !CredentialKind::GithubToken.accepts(&self.main_token) {
            return Err(CoreError::ValidationError(
                "main token is not a GitHub personal access token".into(),
            ));
        }
        if self.secret_name.is_empty() || self.workflow_file.is_empty() {
            return Err(CoreError::ValidationError(
                "secret name and workflow file must not be empty".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn main_repo(&self) -> RepoRef {
        RepoRef::new(&self.main_account_username, &self.main_repo_name)
    }

    /// Repository owned by `username` with the main repository's name.
    #[must_use]
    pub fn repo_for(&self, username: &str) -> RepoRef {
        RepoRef::new(username, &self.main_repo_name)
    }

    #[must_use]
    pub fn main_account(&self) -> Account {
        Account::new(&self.main_account_username, &self.main_token)
    }

    #[must_use]
    pub fn is_main_account(&self, username: &str) -> bool {
        self.main_account_username.eq_ignore_ascii_case(username)
    }

    #[must_use]
    pub fn workflow_path(&self) -> String {
        format!(".github/workflows/{}", self.workflow_file)
    }

    #[must_use]
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("main_account_username", &self.main_account_username)
            .field("main_repo_name", &self.main_repo_name)
            .field("main_token", &mask_secret(&self.main_token))
            .field("secret_name", &self.secret_name)
            .field("workflow_file", &self.workflow_file)
            .field("workflow_ref", &self.workflow_ref)
            .field("billing_threshold_minutes", &self.billing_threshold_minutes)
            .field("request_delay_ms", &self.request_delay_ms)
            .finish()
    }
}

/// Outward view of [`OrchestratorConfig`] with the main token masked.
///
/// Command results carry this instead of the persisted config.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigView {
    pub main_account_username: String,
    pub main_repo_name: String,
    pub main_token: String,
    pub secret_name: String,
    pub workflow_file: String,
    pub workflow_ref: String,
    pub billing_threshold_minutes: f64,
    pub request_delay_ms: u64,
}

impl From<&OrchestratorConfig> for ConfigView {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            main_account_username: config.main_account_username.clone(),
            main_repo_name: config.main_repo_name.clone(),
            main_token: mask_secret(&config.main_token),
            secret_name: config.secret_name.clone(),
            workflow_file: config.workflow_file.clone(),
            workflow_ref: config.workflow_ref.clone(),
            billing_threshold_minutes: config.billing_threshold_minutes,
            request_delay_ms: config.request_delay_ms,
        }
    }
}

impl ConfigView {
    #[must_use]
    pub fn main_repo(&self) -> RepoRef {
        RepoRef::new(&self.main_account_username, &self.main_repo_name)
    }

    #[must_use]
    pub fn workflow_path(&self) -> String {
        format!(".github/workflows/{}", self.workflow_file)
    }
}

fn is_valid_repo_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
