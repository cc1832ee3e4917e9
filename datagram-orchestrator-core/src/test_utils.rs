//! Test helper module
//!
//! In-memory implementations of every storage trait, a scriptable GitHub backend,
//! and factory methods for a ready-made `ServiceContext`.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use tokio::sync::RwLock;

use datagram_orchestrator_github::{
    AuthenticatedUser, ContentFile, GithubApi, InvitationRepository, InviteStatus,
    MergeUpstreamStatus, ParentRepository, PutFileRequest, RepoRef, Repository,
    RepositoryInvitation, SecretInfo, SecretPublicKey, Workflow, WorkflowRun,
};

use crate::error::{CoreError, CoreResult, GithubError};
use crate::services::ServiceContext;
use crate::traits::{
    AccountRepository, ActivityLog, ClientFactory, ConfigRepository, CredentialStore, LogLines,
    OperationCache,
};
use crate::types::{
    Account, CancellationFlag, CompletionIndex, Credential, CredentialKind, OperationKind,
    OperationRecord, OrchestratorConfig, Outcome,
};

type GithubResult<T> = datagram_orchestrator_github::Result<T>;

/// Valid X25519 public key (bytes 1..=32) for sealing in tests.
pub const TEST_PUBLIC_KEY: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA=";

/// Deterministic, well-formed token for a username.
pub fn token_for(username: &str) -> String {
    format!("ghp_{username}_0123456789abcdef")
}

// ===== MockCredentialStore =====

pub struct MockCredentialStore {
    credentials: RwLock<HashMap<CredentialKind, Vec<Credential>>>,
    /// If Some, `load` returns this error
    load_error: RwLock<Option<CoreError>>,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self {
            credentials: RwLock::new(HashMap::new()),
            load_error: RwLock::new(None),
        }
    }

    pub async fn set_load_error(&self, err: Option<CoreError>) {
        *self.load_error.write().await = err;
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn load(&self, kind: CredentialKind) -> CoreResult<Vec<Credential>> {
        if let Some(ref err) = *self.load_error.read().await {
            return Err(err.clone());
        }
        Ok(self
            .credentials
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, kind: CredentialKind, credentials: &[Credential]) -> CoreResult<()> {
        self.credentials
            .write()
            .await
            .insert(kind, credentials.to_vec());
        Ok(())
    }
}

// ===== MockAccountRepository =====

pub struct MockAccountRepository {
    accounts: RwLock<Vec<Account>>,
}

impl MockAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AccountRepository for MockAccountRepository {
    async fn find_all(&self) -> CoreResult<Vec<Account>> {
        Ok(self.accounts.read().await.clone())
    }

    async fn find_by_token(&self, token: &str) -> CoreResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .iter()
            .find(|a| a.token == token)
            .cloned())
    }

    async fn save(&self, account: &Account) -> CoreResult<()> {
        let mut accounts = self.accounts.write().await;
        match accounts.iter_mut().find(|a| a.token == account.token) {
            Some(existing) => *existing = account.clone(),
            None => accounts.push(account.clone()),
        }
        Ok(())
    }

    async fn remove_by_token(&self, token: &str) -> CoreResult<()> {
        self.accounts.write().await.retain(|a| a.token != token);
        Ok(())
    }

    async fn clear(&self) -> CoreResult<usize> {
        let mut accounts = self.accounts.write().await;
        let removed = usize::from(!accounts.is_empty());
        accounts.clear();
        Ok(removed)
    }
}

// ===== MockOperationCache =====

pub struct MockOperationCache {
    records: RwLock<Vec<OperationRecord>>,
    /// If Some, `record_outcome` returns this error
    record_error: RwLock<Option<CoreError>>,
}

impl MockOperationCache {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            record_error: RwLock::new(None),
        }
    }

    pub async fn set_record_error(&self, err: Option<CoreError>) {
        *self.record_error.write().await = err;
    }

    /// Latest outcome recorded for an account
    pub async fn last_outcome(&self, account: &str, kind: OperationKind) -> Option<Outcome> {
        self.records
            .read()
            .await
            .iter()
            .rev()
            .find(|r| r.operation == kind && r.account.eq_ignore_ascii_case(account))
            .map(|r| r.outcome)
    }
}

#[async_trait]
impl OperationCache for MockOperationCache {
    async fn has_completed(&self, account: &str, operation: OperationKind) -> CoreResult<bool> {
        let records = self.records.read().await;
        let index =
            CompletionIndex::from_records(records.iter().filter(|r| r.operation == operation));
        Ok(index.is_completed(account, operation))
    }

    async fn record_outcome(&self, record: &OperationRecord) -> CoreResult<()> {
        if let Some(ref err) = *self.record_error.read().await {
            return Err(err.clone());
        }
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn records(&self, operation: OperationKind) -> CoreResult<Vec<OperationRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.operation == operation)
            .cloned()
            .collect())
    }

    async fn clear(&self, operation: Option<OperationKind>) -> CoreResult<usize> {
        let mut records = self.records.write().await;
        let kinds: HashSet<OperationKind> = records
            .iter()
            .map(|r| r.operation)
            .filter(|k| operation.is_none_or(|op| op == *k))
            .collect();
        records.retain(|r| !kinds.contains(&r.operation));
        Ok(kinds.len())
    }
}

// ===== MockActivityLog =====

pub struct MockActivityLog {
    lines: RwLock<Vec<String>>,
}

impl MockActivityLog {
    pub fn new() -> Self {
        Self {
            lines: RwLock::new(Vec::new()),
        }
    }

    pub async fn entries(&self) -> Vec<String> {
        self.lines.read().await.clone()
    }
}

#[async_trait]
impl ActivityLog for MockActivityLog {
    async fn append(&self, message: &str) -> CoreResult<()> {
        self.lines.write().await.push(message.to_string());
        Ok(())
    }

    async fn lines(&self) -> CoreResult<LogLines> {
        Ok(Box::new(self.entries().await.into_iter()))
    }
}

// ===== MockConfigRepository =====

pub struct MockConfigRepository {
    config: RwLock<Option<OrchestratorConfig>>,
}

impl MockConfigRepository {
    pub fn new() -> Self {
        Self {
            config: RwLock::new(None),
        }
    }
}

#[async_trait]
impl ConfigRepository for MockConfigRepository {
    async fn load(&self) -> CoreResult<Option<OrchestratorConfig>> {
        Ok(self.config.read().await.clone())
    }

    async fn save(&self, config: &OrchestratorConfig) -> CoreResult<()> {
        *self.config.write().await = Some(config.clone());
        Ok(())
    }
}

// ===== MockGithub =====

/// Shared remote state behind every [`MockGithubClient`].
#[derive(Default)]
struct RemoteState {
    users: HashMap<String, Result<AuthenticatedUser, GithubError>>,
    invite_errors: HashMap<String, GithubError>,
    collaborators: HashSet<String>,
    /// (invitee, invitation)
    invitations: Vec<(String, RepositoryInvitation)>,
    repositories: HashMap<String, Repository>,
    /// Forks start private, as forks of a private repository do
    private_forks: bool,
    visibility_error: Option<GithubError>,
    secrets: HashMap<String, SecretInfo>,
    put_secret_failure: Option<(GithubError, bool)>,
    files: HashMap<String, String>,
    workflows: HashMap<String, Vec<Workflow>>,
    runs: HashMap<String, Vec<WorkflowRun>>,
    runs_listing_errors: HashMap<String, GithubError>,
    dispatch_failure: Option<(GithubError, bool)>,
    run_conclusion: Option<String>,
    usage: HashMap<String, f64>,
    /// Flag raised when the named call is made
    cancel_trigger: Option<(String, CancellationFlag)>,
    next_id: u64,
    calls: Vec<String>,
}

impl RemoteState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn new_run(&mut self, event: &str) -> WorkflowRun {
        WorkflowRun {
            id: self.next_id(),
            name: Some("datagram".to_string()),
            event: event.to_string(),
            status: Some("queued".to_string()),
            conclusion: None,
            created_at: Utc::now(),
            html_url: None,
        }
    }
}

fn repo_key(repo: &RepoRef) -> String {
    repo.full_name().to_ascii_lowercase()
}

fn secret_key(repo: &RepoRef, name: &str) -> String {
    format!("{}#{name}", repo_key(repo))
}

fn file_key(repo: &RepoRef, path: &str) -> String {
    format!("{}:{path}", repo_key(repo))
}

fn parse_repo(full_name: &str) -> RepoRef {
    let (owner, name) = full_name.split_once('/').unwrap();
    RepoRef::new(owner, name)
}

/// Scriptable GitHub backend and client factory.
#[derive(Clone, Default)]
pub struct MockGithub {
    state: Arc<Mutex<RemoteState>>,
}

impl MockGithub {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut RemoteState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn add_user(&self, token: &str, login: &str) {
        self.with_state(|s| {
            let id = s.next_id();
            s.users.insert(
                token.to_string(),
                Ok(AuthenticatedUser {
                    login: login.to_string(),
                    id,
                    scopes: Some(vec!["repo".to_string(), "workflow".to_string()]),
                }),
            );
        });
    }

    pub fn fail_user(&self, token: &str, err: GithubError) {
        self.with_state(|s| s.users.insert(token.to_string(), Err(err)));
    }

    pub fn fail_invite(&self, username: &str, err: GithubError) {
        self.with_state(|s| s.invite_errors.insert(username.to_ascii_lowercase(), err));
    }

    pub fn add_repository(&self, full_name: &str, fork_of: Option<&str>) {
        self.with_state(|s| {
            s.repositories.insert(
                full_name.to_ascii_lowercase(),
                Repository {
                    full_name: full_name.to_string(),
                    fork: fork_of.is_some(),
                    private: false,
                    default_branch: "main".to_string(),
                    parent: fork_of.map(|p| ParentRepository {
                        full_name: p.to_string(),
                    }),
                },
            )
        });
    }

    /// Create forks as private repositories.
    pub fn private_forks(&self) {
        self.with_state(|s| s.private_forks = true);
    }

    pub fn fail_visibility(&self, err: GithubError) {
        self.with_state(|s| s.visibility_error = Some(err));
    }

    pub fn is_private(&self, full_name: &str) -> bool {
        self.with_state(|s| {
            s.repositories
                .get(&full_name.to_ascii_lowercase())
                .is_some_and(|r| r.private)
        })
    }

    pub fn set_usage(&self, username: &str, minutes: f64) {
        self.with_state(|s| s.usage.insert(username.to_ascii_lowercase(), minutes));
    }

    /// Fail the next `put_secret`; with `lands` the write still happens.
    pub fn fail_next_put_secret(&self, err: GithubError, lands: bool) {
        self.with_state(|s| s.put_secret_failure = Some((err, lands)));
    }

    /// Fail the next `dispatch_workflow`; with `lands` the run is still created.
    pub fn fail_next_dispatch(&self, err: GithubError, lands: bool) {
        self.with_state(|s| s.dispatch_failure = Some((err, lands)));
    }

    pub fn fail_runs_listing(&self, full_name: &str, err: GithubError) {
        self.with_state(|s| {
            s.runs_listing_errors
                .insert(full_name.to_ascii_lowercase(), err)
        });
    }

    /// Conclusion given to runs once polled. Defaults to `success`.
    pub fn set_run_conclusion(&self, conclusion: &str) {
        self.with_state(|s| s.run_conclusion = Some(conclusion.to_string()));
    }

    /// Raise `flag` while the call `call` (e.g. `"invite alice"`) is in flight.
    pub fn cancel_on(&self, call: &str, flag: &CancellationFlag) {
        self.with_state(|s| s.cancel_trigger = Some((call.to_string(), flag.clone())));
    }

    pub fn push_run(&self, full_name: &str, event: &str, completed: bool) {
        self.with_state(|s| {
            let mut run = s.new_run(event);
            if completed {
                run.status = Some("completed".to_string());
                run.conclusion = Some("success".to_string());
            }
            s.runs
                .entry(full_name.to_ascii_lowercase())
                .or_default()
                .push(run);
        });
    }

    pub fn put_file_content(&self, full_name: &str, path: &str, content: &str) {
        self.with_state(|s| {
            s.files
                .insert(file_key(&parse_repo(full_name), path), content.to_string())
        });
    }

    pub fn file(&self, full_name: &str, path: &str) -> Option<String> {
        self.with_state(|s| s.files.get(&file_key(&parse_repo(full_name), path)).cloned())
    }

    pub fn has_secret(&self, full_name: &str, name: &str) -> bool {
        self.with_state(|s| {
            s.secrets
                .contains_key(&secret_key(&parse_repo(full_name), name))
        })
    }

    pub fn is_collaborator(&self, username: &str) -> bool {
        self.with_state(|s| s.collaborators.contains(&username.to_ascii_lowercase()))
    }

    pub fn is_fork(&self, full_name: &str) -> bool {
        self.with_state(|s| {
            s.repositories
                .get(&full_name.to_ascii_lowercase())
                .is_some_and(|r| r.fork)
        })
    }

    pub fn runs(&self, full_name: &str) -> Vec<WorkflowRun> {
        self.with_state(|s| {
            s.runs
                .get(&full_name.to_ascii_lowercase())
                .cloned()
                .unwrap_or_default()
        })
    }

    /// Calls whose first word is `name`
    pub fn call_count(&self, name: &str) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| c.split(' ').next() == Some(name))
                .count()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }
}

#[async_trait]
impl ClientFactory for MockGithub {
    async fn client_for(&self, token: &str) -> CoreResult<Arc<dyn GithubApi>> {
        Ok(Arc::new(MockGithubClient {
            token: token.to_string(),
            state: self.state.clone(),
        }))
    }
}

/// A client bound to one token on the shared [`MockGithub`] state.
pub struct MockGithubClient {
    token: String,
    state: Arc<Mutex<RemoteState>>,
}

impl MockGithubClient {
    fn with_state<T>(&self, call: String, f: impl FnOnce(&mut RemoteState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        if let Some((trigger, flag)) = &state.cancel_trigger {
            if *trigger == call {
                flag.cancel();
            }
        }
        state.calls.push(call);
        f(&mut state)
    }

    fn login(&self, state: &RemoteState) -> GithubResult<String> {
        match state.users.get(&self.token) {
            Some(Ok(user)) => Ok(user.login.clone()),
            Some(Err(e)) => Err(e.clone()),
            None => Err(GithubError::InvalidCredentials {
                raw_message: Some("Bad credentials".to_string()),
            }),
        }
    }
}

#[async_trait]
impl GithubApi for MockGithubClient {
    async fn authenticated_user(&self) -> GithubResult<AuthenticatedUser> {
        self.with_state("user".to_string(), |s| match s.users.get(&self.token) {
            Some(result) => result.clone(),
            None => Err(GithubError::InvalidCredentials {
                raw_message: Some("Bad credentials".to_string()),
            }),
        })
    }

    async fn get_repository(&self, repo: &RepoRef) -> GithubResult<Option<Repository>> {
        self.with_state(format!("get_repository {repo}"), |s| {
            Ok(s.repositories.get(&repo_key(repo)).cloned())
        })
    }

    async fn invite_collaborator(
        &self,
        repo: &RepoRef,
        username: &str,
        _permission: &str,
    ) -> GithubResult<InviteStatus> {
        self.with_state(format!("invite {username}"), |s| {
            let invitee = username.to_ascii_lowercase();
            if let Some(err) = s.invite_errors.get(&invitee) {
                return Err(err.clone());
            }
            if s.collaborators.contains(&invitee) {
                return Ok(InviteStatus::AlreadyCollaborator);
            }
            if !s.invitations.iter().any(|(who, _)| *who == invitee) {
                let id = s.next_id();
                s.invitations.push((
                    invitee,
                    RepositoryInvitation {
                        id,
                        repository: InvitationRepository {
                            full_name: repo.full_name(),
                        },
                    },
                ));
            }
            Ok(InviteStatus::Invited)
        })
    }

    async fn list_invitations(&self) -> GithubResult<Vec<RepositoryInvitation>> {
        self.with_state("list_invitations".to_string(), |s| {
            let login = self.login(s)?.to_ascii_lowercase();
            Ok(s.invitations
                .iter()
                .filter(|(who, _)| *who == login)
                .map(|(_, invitation)| invitation.clone())
                .collect())
        })
    }

    async fn accept_invitation(&self, invitation_id: u64) -> GithubResult<()> {
        self.with_state(format!("accept {invitation_id}"), |s| {
            let login = self.login(s)?.to_ascii_lowercase();
            let before = s.invitations.len();
            s.invitations.retain(|(_, i)| i.id != invitation_id);
            if s.invitations.len() == before {
                return Err(GithubError::NotFound {
                    resource: format!("invitation {invitation_id}"),
                    raw_message: None,
                });
            }
            s.collaborators.insert(login);
            Ok(())
        })
    }

    async fn create_fork(&self, source: &RepoRef) -> GithubResult<Repository> {
        self.with_state(format!("fork {source}"), |s| {
            let login = self.login(s)?;
            let fork = Repository {
                full_name: format!("{login}/{}", source.name),
                fork: true,
                private: s.private_forks,
                default_branch: "main".to_string(),
                parent: Some(ParentRepository {
                    full_name: source.full_name(),
                }),
            };
            s.repositories
                .insert(fork.full_name.to_ascii_lowercase(), fork.clone());
            Ok(fork)
        })
    }

    async fn merge_upstream(
        &self,
        repo: &RepoRef,
        _branch: &str,
    ) -> GithubResult<MergeUpstreamStatus> {
        self.with_state(format!("merge_upstream {repo}"), |_| {
            Ok(MergeUpstreamStatus::AlreadyUpToDate)
        })
    }

    async fn set_visibility(&self, repo: &RepoRef, public: bool) -> GithubResult<()> {
        self.with_state(format!("set_visibility {repo}"), |s| {
            if let Some(err) = s.visibility_error.clone() {
                return Err(err);
            }
            match s.repositories.get_mut(&repo_key(repo)) {
                Some(found) => {
                    found.private = !public;
                    Ok(())
                }
                None => Err(GithubError::NotFound {
                    resource: repo.full_name(),
                    raw_message: None,
                }),
            }
        })
    }

    async fn get_secret_public_key(&self, repo: &RepoRef) -> GithubResult<SecretPublicKey> {
        self.with_state(format!("public_key {repo}"), |_| {
            Ok(SecretPublicKey {
                key_id: "key-1".to_string(),
                key: TEST_PUBLIC_KEY.to_string(),
            })
        })
    }

    async fn get_secret(&self, repo: &RepoRef, name: &str) -> GithubResult<Option<SecretInfo>> {
        self.with_state(format!("get_secret {repo}"), |s| {
            Ok(s.secrets.get(&secret_key(repo, name)).cloned())
        })
    }

    async fn put_secret(
        &self,
        repo: &RepoRef,
        name: &str,
        _encrypted_value: &str,
        _key_id: &str,
    ) -> GithubResult<()> {
        self.with_state(format!("put_secret {repo}"), |s| {
            let failure = s.put_secret_failure.take();
            if failure.as_ref().is_none_or(|(_, lands)| *lands) {
                let now = Utc::now();
                s.secrets.insert(
                    secret_key(repo, name),
                    SecretInfo {
                        name: name.to_string(),
                        created_at: Some(now),
                        updated_at: Some(now),
                    },
                );
            }
            match failure {
                Some((err, _)) => Err(err),
                None => Ok(()),
            }
        })
    }

    async fn get_file(&self, repo: &RepoRef, path: &str) -> GithubResult<Option<ContentFile>> {
        self.with_state(format!("get_file {repo}"), |s| {
            Ok(s.files.get(&file_key(repo, path)).map(|content| ContentFile {
                path: path.to_string(),
                sha: format!("sha-{}", content.len()),
                content: Some(STANDARD.encode(content)),
            }))
        })
    }

    async fn put_file(&self, repo: &RepoRef, request: &PutFileRequest) -> GithubResult<()> {
        self.with_state(format!("put_file {repo}"), |s| {
            s.files
                .insert(file_key(repo, &request.path), request.content.clone());
            if request.path.starts_with(".github/workflows/") {
                let is_fork = s.repositories.get(&repo_key(repo)).is_some_and(|r| r.fork);
                let id = s.next_id();
                let workflows = s.workflows.entry(repo_key(repo)).or_default();
                if !workflows.iter().any(|w| w.path == request.path) {
                    workflows.push(Workflow {
                        id,
                        name: request.path.clone(),
                        path: request.path.clone(),
                        state: if is_fork {
                            "disabled_fork".to_string()
                        } else {
                            "active".to_string()
                        },
                    });
                }
            }
            Ok(())
        })
    }

    async fn enable_actions(&self, repo: &RepoRef) -> GithubResult<()> {
        self.with_state(format!("enable_actions {repo}"), |_| Ok(()))
    }

    async fn list_workflows(&self, repo: &RepoRef) -> GithubResult<Vec<Workflow>> {
        self.with_state(format!("list_workflows {repo}"), |s| {
            Ok(s.workflows.get(&repo_key(repo)).cloned().unwrap_or_default())
        })
    }

    async fn enable_workflow(&self, repo: &RepoRef, workflow_id: u64) -> GithubResult<()> {
        self.with_state(format!("enable_workflow {repo}"), |s| {
            if let Some(workflow) = s
                .workflows
                .get_mut(&repo_key(repo))
                .and_then(|ws| ws.iter_mut().find(|w| w.id == workflow_id))
            {
                workflow.state = "active".to_string();
            }
            Ok(())
        })
    }

    async fn dispatch_workflow(
        &self,
        repo: &RepoRef,
        _workflow_file: &str,
        _git_ref: &str,
    ) -> GithubResult<()> {
        self.with_state(format!("dispatch {repo}"), |s| {
            let failure = s.dispatch_failure.take();
            if failure.as_ref().is_none_or(|(_, lands)| *lands) {
                let run = s.new_run("workflow_dispatch");
                s.runs.entry(repo_key(repo)).or_default().push(run);
            }
            match failure {
                Some((err, _)) => Err(err),
                None => Ok(()),
            }
        })
    }

    async fn list_workflow_runs(
        &self,
        repo: &RepoRef,
        per_page: u32,
    ) -> GithubResult<Vec<WorkflowRun>> {
        self.with_state(format!("list_runs {repo}"), |s| {
            if let Some(err) = s.runs_listing_errors.get(&repo_key(repo)) {
                return Err(err.clone());
            }
            Ok(s.runs
                .get(&repo_key(repo))
                .map(|runs| {
                    runs.iter()
                        .rev()
                        .take(per_page as usize)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    async fn get_workflow_run(&self, repo: &RepoRef, run_id: u64) -> GithubResult<WorkflowRun> {
        self.with_state(format!("get_run {repo}"), |s| {
            let conclusion = s
                .run_conclusion
                .clone()
                .unwrap_or_else(|| "success".to_string());
            let run = s
                .runs
                .get_mut(&repo_key(repo))
                .and_then(|runs| runs.iter_mut().find(|r| r.id == run_id))
                .ok_or_else(|| GithubError::NotFound {
                    resource: format!("run {run_id}"),
                    raw_message: None,
                })?;
            run.status = Some("completed".to_string());
            run.conclusion = Some(conclusion);
            Ok(run.clone())
        })
    }

    async fn actions_usage_minutes(&self, username: &str) -> GithubResult<f64> {
        self.with_state(format!("usage {username}"), |s| {
            Ok(s.usage
                .get(&username.to_ascii_lowercase())
                .copied()
                .unwrap_or(0.0))
        })
    }
}

// ===== Factory methods =====

/// Every mock behind one `ServiceContext`
pub struct TestHarness {
    pub ctx: Arc<ServiceContext>,
    pub credentials: Arc<MockCredentialStore>,
    pub accounts: Arc<MockAccountRepository>,
    pub cache: Arc<MockOperationCache>,
    pub activity: Arc<MockActivityLog>,
    pub config: Arc<MockConfigRepository>,
    pub github: MockGithub,
}

/// Create a test `ServiceContext` on fresh mocks
pub fn create_test_harness() -> TestHarness {
    let credentials = Arc::new(MockCredentialStore::new());
    let accounts = Arc::new(MockAccountRepository::new());
    let cache = Arc::new(MockOperationCache::new());
    let activity = Arc::new(MockActivityLog::new());
    let config = Arc::new(MockConfigRepository::new());
    let github = MockGithub::new();

    let ctx = Arc::new(ServiceContext::new(
        credentials.clone(),
        accounts.clone(),
        cache.clone(),
        activity.clone(),
        config.clone(),
        Arc::new(github.clone()),
    ));

    TestHarness {
        ctx,
        credentials,
        accounts,
        cache,
        activity,
        config,
        github,
    }
}

/// Configure `owner/datagram` with zero request delay and register validated collaborators
///
/// With `forked`, each collaborator owns a fork and has `fork` cached as completed.
pub async fn seed_collaborators(h: &TestHarness, usernames: &[&str], forked: bool) {
    let mut config = OrchestratorConfig::new("owner", "datagram", token_for("owner"));
    config.request_delay_ms = 0;
    h.config.save(&config).await.unwrap();
    h.github.add_user(&token_for("owner"), "owner");
    h.github.add_repository("owner/datagram", None);

    for username in usernames {
        let token = token_for(username);
        h.github.add_user(&token, username);
        h.accounts
            .save(&Account::new(*username, token))
            .await
            .unwrap();
        if forked {
            h.github
                .add_repository(&format!("{username}/datagram"), Some("owner/datagram"));
            h.cache
                .record_outcome(&OperationRecord::new(
                    "seed",
                    *username,
                    OperationKind::Fork,
                    Outcome::Succeeded,
                ))
                .await
                .unwrap();
        }
    }
}
