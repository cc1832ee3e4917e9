//! Workflow status types

use serde::{Deserialize, Serialize};

use datagram_orchestrator_github::WorkflowRun;

/// Recent workflow runs of one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoWorkflowStatus {
    pub account: String,
    pub repository: String,
    pub runs: Vec<WorkflowRun>,
    /// Set when the runs could not be listed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
