use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Repository addressing ============

/// `owner/name` pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `owner/name`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Case-insensitive comparison against a `owner/name` string.
    #[must_use]
    pub fn matches_full_name(&self, full_name: &str) -> bool {
        self.full_name().eq_ignore_ascii_case(full_name)
    }

    /// URL path prefix `/repos/{owner}/{name}` with both segments percent-encoded.
    pub(crate) fn api_path(&self) -> String {
        format!(
            "/repos/{}/{}",
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.name)
        )
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ============ Users ============

/// The owner of the token a client is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub login: String,
    pub id: u64,
    /// OAuth scopes granted to a classic token. `None` for fine-grained tokens.
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
}

// ============ Repositories ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentRepository {
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Only present on single-repository responses.
    #[serde(default)]
    pub parent: Option<ParentRepository>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl Repository {
    /// Whether this repository is a fork of `source`.
    #[must_use]
    pub fn is_fork_of(&self, source: &RepoRef) -> bool {
        self.fork
            && self
                .parent
                .as_ref()
                .is_some_and(|p| source.matches_full_name(&p.full_name))
    }
}

// ============ Collaboration ============

/// Result of a collaborator invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    /// A new invitation was created (HTTP 201).
    Invited,
    /// The user already has access (HTTP 204).
    AlreadyCollaborator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInvitation {
    pub id: u64,
    pub repository: InvitationRepository,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationRepository {
    pub full_name: String,
}

/// Result of syncing a fork with its upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeUpstreamStatus {
    Merged { message: String },
    AlreadyUpToDate,
}

// ============ Secrets ============

/// Repository public key used to seal Actions secrets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretPublicKey {
    pub key_id: String,
    /// Base64-encoded X25519 public key.
    pub key: String,
}

/// Secret metadata. GitHub never returns secret values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretInfo {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============ Contents ============

/// A file fetched through the contents API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFile {
    pub path: String,
    pub sha: String,
    /// Base64 content, possibly wrapped with newlines.
    #[serde(default)]
    pub content: Option<String>,
}

/// Create-or-update request for a single file.
#[derive(Debug, Clone)]
pub struct PutFileRequest {
    pub path: String,
    pub message: String,
    /// Raw file content; encoded by the client.
    pub content: String,
    /// Blob SHA of the file being replaced. Required for updates.
    pub sha: Option<String>,
    /// Target branch; the default branch when `None`.
    pub branch: Option<String>,
}

// ============ Actions ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub state: String,
}

impl Workflow {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == "active"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub event: String,
    /// `queued`, `in_progress`, `completed`, ...
    pub status: Option<String>,
    /// `success`, `failure`, `cancelled`, ... once completed.
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl WorkflowRun {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("completed")
    }
}

// ============ Billing ============

/// One line of the enhanced billing usage report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsageItem {
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub unit_type: String,
    #[serde(default)]
    pub quantity: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsageReport {
    #[serde(default, alias = "usage")]
    pub usage_items: Vec<UsageItem>,
}

impl UsageReport {
    /// Total Actions minutes in the report.
    pub fn actions_minutes(&self) -> f64 {
        self.usage_items
            .iter()
            .filter(|item| {
                item.product.eq_ignore_ascii_case("actions")
                    && item.unit_type.eq_ignore_ascii_case("minutes")
            })
            .map(|item| item.quantity)
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn repo_ref_matches_case_insensitively() {
        let repo = RepoRef::new("MainUser", "Datagram");
        assert!(repo.matches_full_name("mainuser/datagram"));
        assert!(!repo.matches_full_name("mainuser/other"));
    }

    #[test]
    fn repo_ref_api_path_encodes_segments() {
        let repo = RepoRef::new("a b", "c");
        assert_eq!(repo.api_path(), "/repos/a%20b/c");
    }

    #[test]
    fn fork_detection_uses_parent() {
        let json = r#"{
            "full_name": "alice/datagram",
            "fork": true,
            "default_branch": "main",
            "parent": {"full_name": "Main/Datagram"}
        }"#;
        let repo: Repository = serde_json::from_str(json).unwrap();
        assert!(repo.is_fork_of(&RepoRef::new("main", "datagram")));
        assert!(!repo.is_fork_of(&RepoRef::new("someone", "datagram")));
    }

    #[test]
    fn usage_report_sums_actions_minutes() {
        let json = r#"{"usageItems": [
            {"product": "actions", "unitType": "Minutes", "quantity": 1200.5},
            {"product": "actions", "unitType": "GigabyteHours", "quantity": 3.0},
            {"product": "Actions", "unitType": "minutes", "quantity": 100.0},
            {"product": "packages", "unitType": "Minutes", "quantity": 50.0}
        ]}"#;
        let report: UsageReport = serde_json::from_str(json).unwrap();
        assert!((report.actions_minutes() - 1300.5).abs() < f64::EPSILON);
    }

    #[test]
    fn usage_report_accepts_legacy_key() {
        let json = r#"{"usage": [{"product": "actions", "unitType": "Minutes", "quantity": 10}]}"#;
        let report: UsageReport = serde_json::from_str(json).unwrap();
        assert!((report.actions_minutes() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn workflow_run_completion() {
        let json = r#"{"id": 7, "event": "workflow_dispatch", "status": "completed",
            "conclusion": "success", "created_at": "2025-01-01T00:00:00Z"}"#;
        let run: WorkflowRun = serde_json::from_str(json).unwrap();
        assert!(run.is_completed());
        assert_eq!(run.conclusion.as_deref(), Some("success"));
    }
}
