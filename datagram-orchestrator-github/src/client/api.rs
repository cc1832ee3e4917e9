//! `GithubApi` implementation

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::{GithubError, Result};
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, GithubApi, GithubErrorMapper, RawApiError};
use crate::types::{
    AuthenticatedUser, ContentFile, InviteStatus, MergeUpstreamStatus, PutFileRequest, RepoRef,
    Repository, RepositoryInvitation, SecretInfo, SecretPublicKey, UsageReport, Workflow,
    WorkflowRun,
};

use super::GithubClient;
use super::http::error_message;

/// Invitations and workflows are listed in a single page of this size.
const LIST_PAGE_SIZE: u32 = 100;

#[derive(Serialize)]
struct InviteBody<'a> {
    permission: &'a str,
}

#[derive(Serialize)]
struct MergeUpstreamBody<'a> {
    branch: &'a str,
}

#[derive(Serialize)]
struct VisibilityBody {
    private: bool,
}

#[derive(Deserialize)]
struct MergeUpstreamResponse {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct PutSecretBody<'a> {
    encrypted_value: &'a str,
    key_id: &'a str,
}

#[derive(Serialize)]
struct PutFileBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Serialize)]
struct ActionsPermissionsBody {
    enabled: bool,
    allowed_actions: &'static str,
}

#[derive(Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

#[derive(Deserialize)]
struct WorkflowList {
    #[serde(default)]
    workflows: Vec<Workflow>,
}

#[derive(Deserialize)]
struct WorkflowRunList {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

/// Percent-encodes each segment of a repository file path.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a merge-upstream message reports that nothing needed merging.
fn is_up_to_date(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("up to date") || message.contains("not behind") || message.contains("already")
}

#[async_trait]
impl GithubApi for GithubClient {
    async fn authenticated_user(&self) -> Result<AuthenticatedUser> {
        let response = self.send::<()>(Method::GET, "/user", None).await?;
        self.check(&response, ErrorContext::resource("user"))?;

        let mut user: AuthenticatedUser = HttpUtils::parse_json(&response.body)?;
        user.scopes = response.oauth_scopes.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        });
        Ok(user)
    }

    async fn get_repository(&self, repo: &RepoRef) -> Result<Option<Repository>> {
        self.get_optional(&repo.api_path(), ErrorContext::resource(repo.full_name()))
            .await
    }

    async fn invite_collaborator(
        &self,
        repo: &RepoRef,
        username: &str,
        permission: &str,
    ) -> Result<InviteStatus> {
        let path = format!(
            "{}/collaborators/{}",
            repo.api_path(),
            urlencoding::encode(username)
        );
        let response = self
            .request_unit(
                Method::PUT,
                &path,
                Some(&InviteBody { permission }),
                ErrorContext::resource(format!("{repo} collaborator {username}")),
            )
            .await?;

        Ok(if response.status == 204 {
            InviteStatus::AlreadyCollaborator
        } else {
            InviteStatus::Invited
        })
    }

    async fn list_invitations(&self) -> Result<Vec<RepositoryInvitation>> {
        self.get(
            &format!("/user/repository_invitations?per_page={LIST_PAGE_SIZE}"),
            ErrorContext::resource("repository invitations"),
        )
        .await
    }

    async fn accept_invitation(&self, invitation_id: u64) -> Result<()> {
        self.request_unit::<()>(
            Method::PATCH,
            &format!("/user/repository_invitations/{invitation_id}"),
            None,
            ErrorContext::resource(format!("invitation {invitation_id}")),
        )
        .await?;
        Ok(())
    }

    async fn create_fork(&self, source: &RepoRef) -> Result<Repository> {
        self.request_json(
            Method::POST,
            &format!("{}/forks", source.api_path()),
            Some(&serde_json::json!({})),
            ErrorContext::resource(source.full_name()),
        )
        .await
    }

    async fn merge_upstream(&self, repo: &RepoRef, branch: &str) -> Result<MergeUpstreamStatus> {
        let response = self
            .send(
                Method::POST,
                &format!("{}/merge-upstream", repo.api_path()),
                Some(&MergeUpstreamBody { branch }),
            )
            .await?;

        if response.is_success() {
            let parsed: MergeUpstreamResponse = HttpUtils::parse_json(&response.body)?;
            return Ok(if is_up_to_date(&parsed.message) {
                MergeUpstreamStatus::AlreadyUpToDate
            } else {
                MergeUpstreamStatus::Merged {
                    message: parsed.message,
                }
            });
        }

        let message = error_message(&response.body);
        if matches!(response.status, 409 | 422) && is_up_to_date(&message) {
            return Ok(MergeUpstreamStatus::AlreadyUpToDate);
        }
        Err(self.map_error(
            RawApiError::new(response.status, message),
            ErrorContext::resource(repo.full_name()),
        ))
    }

    async fn set_visibility(&self, repo: &RepoRef, public: bool) -> Result<()> {
        self.request_unit(
            Method::PATCH,
            &repo.api_path(),
            Some(&VisibilityBody { private: !public }),
            ErrorContext::resource(repo.full_name()),
        )
        .await?;
        Ok(())
    }

    async fn get_secret_public_key(&self, repo: &RepoRef) -> Result<SecretPublicKey> {
        self.get(
            &format!("{}/actions/secrets/public-key", repo.api_path()),
            ErrorContext::resource(format!("{repo} secrets public key")),
        )
        .await
    }

    async fn get_secret(&self, repo: &RepoRef, name: &str) -> Result<Option<SecretInfo>> {
        self.get_optional(
            &format!(
                "{}/actions/secrets/{}",
                repo.api_path(),
                urlencoding::encode(name)
            ),
            ErrorContext::resource(format!("{repo} secret {name}")),
        )
        .await
    }

    async fn put_secret(
        &self,
        repo: &RepoRef,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<()> {
        self.request_unit(
            Method::PUT,
            &format!(
                "{}/actions/secrets/{}",
                repo.api_path(),
                urlencoding::encode(name)
            ),
            Some(&PutSecretBody {
                encrypted_value,
                key_id,
            }),
            ErrorContext::resource(format!("{repo} secret {name}")),
        )
        .await?;
        Ok(())
    }

    async fn get_file(&self, repo: &RepoRef, path: &str) -> Result<Option<ContentFile>> {
        self.get_optional(
            &format!("{}/contents/{}", repo.api_path(), encode_path(path)),
            ErrorContext::resource(format!("{repo}:{path}")),
        )
        .await
    }

    async fn put_file(&self, repo: &RepoRef, request: &PutFileRequest) -> Result<()> {
        let body = PutFileBody {
            message: &request.message,
            content: STANDARD.encode(request.content.as_bytes()),
            sha: request.sha.as_deref(),
            branch: request.branch.as_deref(),
        };
        self.request_unit(
            Method::PUT,
            &format!("{}/contents/{}", repo.api_path(), encode_path(&request.path)),
            Some(&body),
            ErrorContext::resource(format!("{repo}:{}", request.path)),
        )
        .await?;
        Ok(())
    }

    async fn enable_actions(&self, repo: &RepoRef) -> Result<()> {
        self.request_unit(
            Method::PUT,
            &format!("{}/actions/permissions", repo.api_path()),
            Some(&ActionsPermissionsBody {
                enabled: true,
                allowed_actions: "all",
            }),
            ErrorContext::resource(format!("{repo} actions")),
        )
        .await?;
        Ok(())
    }

    async fn list_workflows(&self, repo: &RepoRef) -> Result<Vec<Workflow>> {
        let list: WorkflowList = self
            .get(
                &format!(
                    "{}/actions/workflows?per_page={LIST_PAGE_SIZE}",
                    repo.api_path()
                ),
                ErrorContext::resource(format!("{repo} workflows")),
            )
            .await?;
        Ok(list.workflows)
    }

    async fn enable_workflow(&self, repo: &RepoRef, workflow_id: u64) -> Result<()> {
        self.request_unit::<()>(
            Method::PUT,
            &format!(
                "{}/actions/workflows/{workflow_id}/enable",
                repo.api_path()
            ),
            None,
            ErrorContext::resource(format!("{repo} workflow {workflow_id}")),
        )
        .await?;
        Ok(())
    }

    async fn dispatch_workflow(
        &self,
        repo: &RepoRef,
        workflow_file: &str,
        git_ref: &str,
    ) -> Result<()> {
        self.request_unit(
            Method::POST,
            &format!(
                "{}/actions/workflows/{}/dispatches",
                repo.api_path(),
                urlencoding::encode(workflow_file)
            ),
            Some(&DispatchBody { git_ref }),
            ErrorContext::resource(format!("{repo} workflow {workflow_file}")),
        )
        .await?;
        Ok(())
    }

    async fn list_workflow_runs(&self, repo: &RepoRef, per_page: u32) -> Result<Vec<WorkflowRun>> {
        let list: WorkflowRunList = self
            .get(
                &format!("{}/actions/runs?per_page={per_page}", repo.api_path()),
                ErrorContext::resource(format!("{repo} workflow runs")),
            )
            .await?;
        Ok(list.workflow_runs)
    }

    async fn get_workflow_run(&self, repo: &RepoRef, run_id: u64) -> Result<WorkflowRun> {
        self.get(
            &format!("{}/actions/runs/{run_id}", repo.api_path()),
            ErrorContext::resource(format!("{repo} run {run_id}")),
        )
        .await
    }

    async fn actions_usage_minutes(&self, username: &str) -> Result<f64> {
        let report: UsageReport = self
            .get(
                &format!(
                    "/users/{}/settings/billing/usage",
                    urlencoding::encode(username)
                ),
                ErrorContext::resource(format!("{username} billing usage")),
            )
            .await?;
        let minutes = report.actions_minutes();
        if minutes.is_finite() {
            Ok(minutes)
        } else {
            Err(self.parse_error(format!("non-finite usage total for {username}")))
        }
    }
}

impl ContentFile {
    /// Decoded file content, if the API returned it inline.
    pub fn decoded_content(&self) -> Result<Option<String>> {
        let Some(encoded) = &self.content else {
            return Ok(None);
        };
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| GithubError::ParseError {
                detail: format!("invalid base64 content in {}: {e}", self.path),
            })?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| GithubError::ParseError {
                detail: format!("non UTF-8 content in {}: {e}", self.path),
            })
    }
}
