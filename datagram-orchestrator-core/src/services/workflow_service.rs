//! Workflow run status

use std::sync::Arc;

use crate::error::CoreResult;
use crate::services::batch_orchestrator::resolve_targets;
use crate::services::ServiceContext;
use crate::types::{OperationKind, RepoWorkflowStatus, TargetScope};

/// Runs shown per repository.
const RECENT_RUNS: u32 = 3;

/// Workflow status service
pub struct WorkflowService {
    ctx: Arc<ServiceContext>,
}

impl WorkflowService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Most recent runs of every repository in `scope`
    ///
    /// A repository whose runs cannot be listed is reported with `error` set.
    pub async fn status(&self, scope: TargetScope) -> CoreResult<Vec<RepoWorkflowStatus>> {
        let config = self.ctx.require_config().await?;
        let targets =
            resolve_targets(&self.ctx, &config, OperationKind::TriggerWorkflow, scope).await?;

        let mut statuses = Vec::with_capacity(targets.len());
        for account in targets {
            let repo = if config.is_main_account(&account.username) {
                config.main_repo()
            } else {
                config.repo_for(&account.username)
            };
            let client = self.ctx.client_for(&account.token).await?;
            let (runs, error) = match client.list_workflow_runs(&repo, RECENT_RUNS).await {
                Ok(runs) => (runs, None),
                Err(e) => {
                    log::warn!("Could not list runs on {repo}: {e}");
                    (Vec::new(), Some(e.to_string()))
                }
            };
            statuses.push(RepoWorkflowStatus {
                account: account.username,
                repository: repo.full_name(),
                runs,
                error,
            });
        }
        Ok(statuses)
    }
}
