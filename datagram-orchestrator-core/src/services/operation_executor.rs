//! Per-account execution of a single operation kind

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use datagram_orchestrator_github::{
    seal_secret, GithubApi, InviteStatus, MergeUpstreamStatus, PutFileRequest, RepoRef,
    Workflow, WorkflowRun,
};

use crate::error::{CoreError, CoreResult, FailureClass, GithubError};
use crate::services::ServiceContext;
use crate::types::{
    Account, BatchOptions, CancellationFlag, CredentialKind, OperationKind, OrchestratorConfig,
    Outcome,
};

/// Permission granted to invited collaborators.
const COLLABORATOR_PERMISSION: &str = "push";
/// Workflow registration after a push is asynchronous on GitHub's side.
const WORKFLOW_DISCOVERY_ATTEMPTS: u32 = 5;
const WORKFLOW_DISCOVERY_DELAY: Duration = Duration::from_secs(3);
const RUN_DISCOVERY_ATTEMPTS: u32 = 5;
/// Runs inspected when looking for a freshly dispatched run.
const RECENT_RUNS_PAGE: u32 = 10;
/// Tolerated clock difference between this host and GitHub timestamps.
const CLOCK_SKEW_SECS: i64 = 5;

/// Non-failure result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub outcome: Outcome,
    pub detail: Option<String>,
}

impl StepOutcome {
    pub fn succeeded(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Succeeded,
            detail: Some(detail.into()),
        }
    }

    pub fn skipped(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Skipped,
            detail: Some(detail.into()),
        }
    }
}

/// Executes one operation kind against individual accounts.
///
/// Built once per run by [`OperationExecutor::prepare`], which performs the run-level
/// setup checks. Errors returned by [`execute`](Self::execute) are per-account failures.
pub struct OperationExecutor {
    ctx: Arc<ServiceContext>,
    config: OrchestratorConfig,
    options: BatchOptions,
    cancel: CancellationFlag,
    secret_payload: Option<String>,
}

impl OperationExecutor {
    /// Check run-level prerequisites for `kind`
    ///
    /// # Errors
    /// * `NoValidCredentials` - `SetSecret` without stored API keys
    /// * `ConfigurationMissing` - `Deploy` without workflow content
    pub async fn prepare(
        ctx: Arc<ServiceContext>,
        config: OrchestratorConfig,
        kind: OperationKind,
        options: BatchOptions,
        cancel: CancellationFlag,
    ) -> CoreResult<Self> {
        let secret_payload = if kind == OperationKind::SetSecret {
            let keys = ctx.credential_store().load(CredentialKind::ApiKey).await?;
            if keys.is_empty() {
                return Err(CoreError::NoValidCredentials(
                    "no API keys imported".to_string(),
                ));
            }
            let values: Vec<&str> = keys.iter().map(|k| k.secret.as_str()).collect();
            Some(serde_json::to_string(&values)?)
        } else {
            None
        };

        if kind == OperationKind::Deploy
            && options
                .workflow_content
                .as_deref()
                .is_none_or(|content| content.trim().is_empty())
        {
            return Err(CoreError::ConfigurationMissing(
                "deploy requires workflow file content".to_string(),
            ));
        }

        Ok(Self {
            ctx,
            config,
            options,
            cancel,
            secret_payload,
        })
    }

    /// Run `kind` for one account
    pub async fn execute(&self, kind: OperationKind, account: &Account) -> CoreResult<StepOutcome> {
        match kind {
            OperationKind::Invite => self.invite(account).await,
            OperationKind::AcceptInvite => self.accept_invite(account).await,
            OperationKind::Fork => self.fork(account).await,
            OperationKind::SetSecret => self.set_secret(account).await,
            OperationKind::Deploy => self.deploy(account).await,
            OperationKind::TriggerWorkflow => self.trigger_workflow(account).await,
            OperationKind::ValidateToken => self.validate_token(account).await,
        }
    }

    /// Repository an account acts on: the main repository or the account's fork
    fn target_repo(&self, account: &Account) -> RepoRef {
        if self.config.is_main_account(&account.username) {
            self.config.main_repo()
        } else {
            self.config.repo_for(&account.username)
        }
    }

    async fn invite(&self, account: &Account) -> CoreResult<StepOutcome> {
        if self.config.is_main_account(&account.username) {
            return Ok(StepOutcome::skipped("main account owns the repository"));
        }
        let main = self.ctx.client_for(&self.config.main_token).await?;
        let repo = self.config.main_repo();
        match main
            .invite_collaborator(&repo, &account.username, COLLABORATOR_PERMISSION)
            .await?
        {
            InviteStatus::Invited => Ok(StepOutcome::succeeded(format!("invited to {repo}"))),
            InviteStatus::AlreadyCollaborator => Ok(StepOutcome::succeeded(format!(
                "already a collaborator on {repo}"
            ))),
        }
    }

    async fn accept_invite(&self, account: &Account) -> CoreResult<StepOutcome> {
        let client = self.ctx.client_for(&account.token).await?;
        let repo = self.config.main_repo();
        let invitations = client.list_invitations().await?;
        let Some(invitation) = invitations
            .iter()
            .find(|i| repo.matches_full_name(&i.repository.full_name))
        else {
            return Ok(StepOutcome::skipped(format!(
                "no pending invitation to {repo}"
            )));
        };
        client.accept_invitation(invitation.id).await?;
        Ok(StepOutcome::succeeded(format!(
            "accepted invitation {} to {repo}",
            invitation.id
        )))
    }

    async fn fork(&self, account: &Account) -> CoreResult<StepOutcome> {
        let client = self.ctx.client_for(&account.token).await?;
        let source = self.config.main_repo();
        let target = self.config.repo_for(&account.username);

        let (fork, detail) = match client.get_repository(&target).await? {
            Some(existing) if existing.is_fork_of(&source) => {
                let detail = match client
                    .merge_upstream(&target, &existing.default_branch)
                    .await?
                {
                    MergeUpstreamStatus::Merged { message } => format!("fork synced: {message}"),
                    MergeUpstreamStatus::AlreadyUpToDate => "fork already up to date".to_string(),
                };
                (existing, detail)
            }
            Some(_) => {
                return Err(CoreError::RemoteRejected(format!(
                    "{target} exists and is not a fork of {source}"
                )));
            }
            None => match client.create_fork(&source).await {
                Ok(fork) => {
                    let detail = format!("forked as {}", fork.full_name);
                    (fork, detail)
                }
                Err(e) if e.class() == FailureClass::TransientNetwork => {
                    // POST is not retried; check whether the fork was created anyway
                    match client.get_repository(&target).await {
                        Ok(Some(fork)) if fork.is_fork_of(&source) => {
                            log::warn!("Fork of {source} for {target} landed despite: {e}");
                            let detail = format!("forked as {}", fork.full_name);
                            (fork, detail)
                        }
                        _ => return Err(e.into()),
                    }
                }
                Err(e) => return Err(e.into()),
            },
        };

        if !fork.private {
            return Ok(StepOutcome::succeeded(detail));
        }
        // Actions minutes are only free on public repositories
        match client.set_visibility(&target, true).await {
            Ok(()) => Ok(StepOutcome::succeeded(format!("{detail}, made public"))),
            Err(GithubError::ValidationFailed { raw_message }) => {
                log::debug!("Visibility of {target} left as is: {raw_message}");
                Ok(StepOutcome::succeeded(detail))
            }
            Err(e) => {
                log::warn!("Could not make {target} public: {e}");
                Ok(StepOutcome::succeeded(format!("{detail}, still private: {e}")))
            }
        }
    }

    async fn set_secret(&self, account: &Account) -> CoreResult<StepOutcome> {
        let payload = self.secret_payload.as_deref().ok_or_else(|| {
            CoreError::NoValidCredentials("no API keys loaded for this run".to_string())
        })?;
        let client = self.ctx.client_for(&account.token).await?;
        let repo = self.target_repo(account);
        let name = &self.config.secret_name;

        let key = client.get_secret_public_key(&repo).await?;
        let sealed = seal_secret(&key.key, payload)?;

        let started = Utc::now();
        if let Err(e) = client.put_secret(&repo, name, &sealed, &key.key_id).await {
            if e.class() != FailureClass::TransientNetwork
                || !secret_written_since(client.as_ref(), &repo, name, started).await
            {
                return Err(e.into());
            }
            log::warn!("Secret {name} on {repo} was written despite: {e}");
        }

        match client.get_secret(&repo, name).await? {
            Some(_) => Ok(StepOutcome::succeeded(format!("secret {name} set on {repo}"))),
            None => Err(CoreError::RemoteRejected(format!(
                "secret {name} not present on {repo} after write"
            ))),
        }
    }

    async fn deploy(&self, account: &Account) -> CoreResult<StepOutcome> {
        let content = self.options.workflow_content.as_deref().ok_or_else(|| {
            CoreError::ConfigurationMissing("deploy requires workflow file content".to_string())
        })?;
        let client = self.ctx.client_for(&account.token).await?;
        let repo = self.target_repo(account);
        let repository = client
            .get_repository(&repo)
            .await?
            .ok_or_else(|| CoreError::RemoteRejected(format!("{repo} does not exist")))?;

        if repository.fork {
            if let Err(e) = client
                .merge_upstream(&repo, &repository.default_branch)
                .await
            {
                log::warn!("Sync of {repo} before deploy failed, continuing: {e}");
            }
        }

        let path = self.config.workflow_path();
        let existing = client.get_file(&repo, &path).await?;
        let unchanged = match &existing {
            Some(file) => file.decoded_content()?.as_deref() == Some(content),
            None => false,
        };
        if unchanged {
            log::debug!("{path} on {repo} is up to date");
        } else {
            let request = PutFileRequest {
                path: path.clone(),
                message: format!("Deploy {}", self.config.workflow_file),
                content: content.to_string(),
                sha: existing.map(|f| f.sha),
                branch: Some(repository.default_branch.clone()),
            };
            client.put_file(&repo, &request).await?;
        }

        client.enable_actions(&repo).await?;
        let workflow = self.discover_workflow(client.as_ref(), &repo, &path).await?;
        if !workflow.is_active() {
            client.enable_workflow(&repo, workflow.id).await?;
        }

        Ok(StepOutcome::succeeded(format!(
            "{} {path} on {repo}, workflow {} enabled",
            if unchanged { "kept" } else { "wrote" },
            workflow.id
        )))
    }

    async fn discover_workflow(
        &self,
        client: &dyn GithubApi,
        repo: &RepoRef,
        path: &str,
    ) -> CoreResult<Workflow> {
        for attempt in 1..=WORKFLOW_DISCOVERY_ATTEMPTS {
            let workflows = client.list_workflows(repo).await?;
            if let Some(workflow) = workflows.into_iter().find(|w| w.path == path) {
                return Ok(workflow);
            }
            if attempt < WORKFLOW_DISCOVERY_ATTEMPTS {
                log::debug!("{path} not yet registered on {repo} (attempt {attempt})");
                tokio::time::sleep(WORKFLOW_DISCOVERY_DELAY).await;
            }
        }
        Err(CoreError::RemoteRejected(format!(
            "workflow {path} was not registered on {repo}"
        )))
    }

    async fn trigger_workflow(&self, account: &Account) -> CoreResult<StepOutcome> {
        let client = self.ctx.client_for(&account.token).await?;
        let repo = self.target_repo(account);

        if !self.options.ignore_billing_threshold {
            let threshold = self.config.billing_threshold_minutes;
            match client.actions_usage_minutes(&account.username).await {
                Ok(used) if used >= threshold => {
                    return Ok(StepOutcome::skipped(format!(
                        "Actions usage {used:.0} min is over the {threshold:.0} min threshold"
                    )));
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!(
                        "Billing lookup for {} failed, dispatching anyway: {e}",
                        account.username
                    );
                }
            }
        }

        let workflow_file = &self.config.workflow_file;
        let git_ref = &self.config.workflow_ref;
        let dispatched_at = Utc::now();
        if let Err(e) = client
            .dispatch_workflow(&repo, workflow_file, git_ref)
            .await
        {
            if e.class() != FailureClass::TransientNetwork
                || find_dispatched_run(client.as_ref(), &repo, dispatched_at)
                    .await
                    .is_none()
            {
                return Err(e.into());
            }
            log::warn!("Dispatch of {workflow_file} on {repo} landed despite: {e}");
        }

        if !self.options.wait_for_completion {
            return Ok(StepOutcome::succeeded(format!(
                "dispatched {workflow_file} on {repo}@{git_ref}"
            )));
        }

        let Some(run) = self
            .discover_run(client.as_ref(), &repo, dispatched_at)
            .await
        else {
            return Ok(StepOutcome::succeeded(format!(
                "dispatched {workflow_file} on {repo}@{git_ref}, run not visible yet"
            )));
        };
        self.wait_for_run(client.as_ref(), &repo, run).await
    }

    async fn discover_run(
        &self,
        client: &dyn GithubApi,
        repo: &RepoRef,
        since: DateTime<Utc>,
    ) -> Option<WorkflowRun> {
        for attempt in 1..=RUN_DISCOVERY_ATTEMPTS {
            if let Some(run) = find_dispatched_run(client, repo, since).await {
                return Some(run);
            }
            if attempt < RUN_DISCOVERY_ATTEMPTS && !self.cancel.is_cancelled() {
                tokio::time::sleep(self.options.poll_interval).await;
            }
        }
        None
    }

    /// Poll a run until it completes, times out, or the batch is cancelled.
    ///
    /// Only a completed run with a non-success conclusion is an error; the dispatch
    /// itself already landed.
    async fn wait_for_run(
        &self,
        client: &dyn GithubApi,
        repo: &RepoRef,
        mut run: WorkflowRun,
    ) -> CoreResult<StepOutcome> {
        let deadline = Instant::now() + self.options.completion_timeout;
        loop {
            if run.is_completed() {
                let conclusion = run.conclusion.as_deref().unwrap_or("unknown");
                return if conclusion == "success" {
                    Ok(StepOutcome::succeeded(format!(
                        "run {} on {repo} completed: {conclusion}",
                        run.id
                    )))
                } else {
                    Err(CoreError::RemoteRejected(format!(
                        "run {} on {repo} completed: {conclusion}",
                        run.id
                    )))
                };
            }
            if self.cancel.is_cancelled() {
                return Ok(StepOutcome::succeeded(format!(
                    "dispatched run {} on {repo}, monitoring cancelled",
                    run.id
                )));
            }
            if Instant::now() + self.options.poll_interval > deadline {
                return Ok(StepOutcome::succeeded(format!(
                    "dispatched run {} on {repo}, still {} after timeout",
                    run.id,
                    run.status.as_deref().unwrap_or("pending")
                )));
            }

            tokio::time::sleep(self.options.poll_interval).await;
            match client.get_workflow_run(repo, run.id).await {
                Ok(latest) => run = latest,
                Err(e) => log::warn!("Polling run {} on {repo} failed: {e}", run.id),
            }
        }
    }

    async fn validate_token(&self, account: &Account) -> CoreResult<StepOutcome> {
        let client = self.ctx.client_for(&account.token).await?;
        let user = client.authenticated_user().await?;
        if !account.is(&user.login) {
            return Err(CoreError::RemoteRejected(format!(
                "token belongs to {}, not {}",
                user.login, account.username
            )));
        }
        let refreshed = Account::new(&account.username, &account.token).with_scopes(user.scopes);
        self.ctx.account_repository().save(&refreshed).await?;
        Ok(StepOutcome::succeeded(format!("token valid for {}", user.login)))
    }
}

/// Whether a secret's `updated_at` shows a write at or after `since`.
async fn secret_written_since(
    client: &dyn GithubApi,
    repo: &RepoRef,
    name: &str,
    since: DateTime<Utc>,
) -> bool {
    match client.get_secret(repo, name).await {
        Ok(Some(secret)) => secret
            .updated_at
            .is_some_and(|at| at + chrono::Duration::seconds(CLOCK_SKEW_SECS) >= since),
        Ok(None) => false,
        Err(e) => {
            log::warn!("Could not verify secret {name} on {repo}: {e}");
            false
        }
    }
}

/// Newest `workflow_dispatch` run created at or after `since`.
async fn find_dispatched_run(
    client: &dyn GithubApi,
    repo: &RepoRef,
    since: DateTime<Utc>,
) -> Option<WorkflowRun> {
    let runs = match client.list_workflow_runs(repo, RECENT_RUNS_PAGE).await {
        Ok(runs) => runs,
        Err(e) => {
            log::warn!("Could not list runs on {repo}: {e}");
            return None;
        }
    };
    runs.into_iter()
        .filter(|run| run.event == "workflow_dispatch")
        .filter(|run| run.created_at + chrono::Duration::seconds(CLOCK_SKEW_SECS) >= since)
        .max_by_key(|run| run.created_at)
}
