use async_trait::async_trait;

use crate::error::{GithubError, Result};
use crate::types::{
    AuthenticatedUser, ContentFile, InviteStatus, MergeUpstreamStatus, PutFileRequest, RepoRef,
    Repository, RepositoryInvitation, SecretInfo, SecretPublicKey, Workflow, WorkflowRun,
};

/// Raw API error (internal)
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// HTTP status
    pub status: u16,
    /// `message` field of the error body, or the raw body
    pub message: String,
}

impl RawApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Context for error mapping (internal)
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// What the call addressed, used for `NotFound`
    pub resource: Option<String>,
}

impl ErrorContext {
    pub fn resource(resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
        }
    }
}

/// Maps raw API errors to [`GithubError`] (internal)
pub(crate) trait GithubErrorMapper {
    /// Map a non-success response to the unified error type
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> GithubError;

    /// Shortcut: parse error
    fn parse_error(&self, detail: impl ToString) -> GithubError {
        GithubError::ParseError {
            detail: detail.to_string(),
        }
    }

    /// Shortcut: unknown error (fallback)
    fn unknown_error(&self, raw: RawApiError) -> GithubError {
        GithubError::Unknown {
            status: Some(raw.status),
            raw_message: raw.message,
        }
    }
}

/// GitHub REST operations used by the orchestrator.
///
/// One instance is bound to one token; every call acts as that token's owner.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// `GET /user`: the token owner, with granted scopes when the token is classic.
    async fn authenticated_user(&self) -> Result<AuthenticatedUser>;

    /// `GET /repos/{owner}/{repo}`. `None` when the repository does not exist.
    async fn get_repository(&self, repo: &RepoRef) -> Result<Option<Repository>>;

    /// `PUT /repos/{owner}/{repo}/collaborators/{username}`.
    async fn invite_collaborator(
        &self,
        repo: &RepoRef,
        username: &str,
        permission: &str,
    ) -> Result<InviteStatus>;

    /// `GET /user/repository_invitations`: pending invitations for the token owner.
    async fn list_invitations(&self) -> Result<Vec<RepositoryInvitation>>;

    /// `PATCH /user/repository_invitations/{id}`.
    async fn accept_invitation(&self, invitation_id: u64) -> Result<()>;

    /// `POST /repos/{owner}/{repo}/forks` into the token owner's account.
    async fn create_fork(&self, source: &RepoRef) -> Result<Repository>;

    /// `POST /repos/{owner}/{repo}/merge-upstream`.
    async fn merge_upstream(&self, repo: &RepoRef, branch: &str) -> Result<MergeUpstreamStatus>;

    /// `PATCH /repos/{owner}/{repo}` setting `private`. Repeating it is harmless.
    async fn set_visibility(&self, repo: &RepoRef, public: bool) -> Result<()>;

    /// `GET /repos/{owner}/{repo}/actions/secrets/public-key`.
    async fn get_secret_public_key(&self, repo: &RepoRef) -> Result<SecretPublicKey>;

    /// `GET /repos/{owner}/{repo}/actions/secrets/{name}`. `None` when absent.
    async fn get_secret(&self, repo: &RepoRef, name: &str) -> Result<Option<SecretInfo>>;

    /// `PUT /repos/{owner}/{repo}/actions/secrets/{name}` (create or update).
    async fn put_secret(
        &self,
        repo: &RepoRef,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<()>;

    /// `GET /repos/{owner}/{repo}/contents/{path}`. `None` when absent.
    async fn get_file(&self, repo: &RepoRef, path: &str) -> Result<Option<ContentFile>>;

    /// `PUT /repos/{owner}/{repo}/contents/{path}`.
    async fn put_file(&self, repo: &RepoRef, request: &PutFileRequest) -> Result<()>;

    /// `PUT /repos/{owner}/{repo}/actions/permissions` with all actions allowed.
    async fn enable_actions(&self, repo: &RepoRef) -> Result<()>;

    /// `GET /repos/{owner}/{repo}/actions/workflows`.
    async fn list_workflows(&self, repo: &RepoRef) -> Result<Vec<Workflow>>;

    /// `PUT /repos/{owner}/{repo}/actions/workflows/{id}/enable`.
    async fn enable_workflow(&self, repo: &RepoRef, workflow_id: u64) -> Result<()>;

    /// `POST /repos/{owner}/{repo}/actions/workflows/{file}/dispatches`.
    async fn dispatch_workflow(&self, repo: &RepoRef, workflow_file: &str, git_ref: &str)
    -> Result<()>;

    /// `GET /repos/{owner}/{repo}/actions/runs`, newest first.
    async fn list_workflow_runs(&self, repo: &RepoRef, per_page: u32) -> Result<Vec<WorkflowRun>>;

    /// `GET /repos/{owner}/{repo}/actions/runs/{id}`.
    async fn get_workflow_run(&self, repo: &RepoRef, run_id: u64) -> Result<WorkflowRun>;

    /// Actions minutes consumed by `username` in the current billing period.
    async fn actions_usage_minutes(&self, username: &str) -> Result<f64>;
}
