//! Batch run options and results

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, FailureClass};

use super::{OperationKind, OperationState};

/// Which repositories a repository-level step runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetScope {
    /// The main account's repository only
    Main,
    /// Forks owned by collaborators that completed the fork step
    Collaborators,
    #[default]
    All,
}

impl TargetScope {
    #[must_use]
    pub fn includes_main(self) -> bool {
        matches!(self, Self::Main | Self::All)
    }

    #[must_use]
    pub fn includes_collaborators(self) -> bool {
        matches!(self, Self::Collaborators | Self::All)
    }
}

impl std::str::FromStr for TargetScope {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "main" => Ok(Self::Main),
            "collaborators" => Ok(Self::Collaborators),
            "all" => Ok(Self::All),
            other => Err(CoreError::ValidationError(format!(
                "unknown target scope: {other}"
            ))),
        }
    }
}

/// Default delay between workflow run status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default upper bound when waiting for a workflow run to complete.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// Options for a single batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub scope: TargetScope,
    /// Re-run accounts the cache already marks as completed
    pub force_retry: bool,
    /// Maximum accounts in flight at once (minimum 1)
    pub concurrency: usize,
    /// Delay before each account. `None` uses the configured request delay.
    pub pacing: Option<Duration>,
    pub ignore_billing_threshold: bool,
    /// After a dispatch, poll the run until it completes
    pub wait_for_completion: bool,
    pub poll_interval: Duration,
    pub completion_timeout: Duration,
    /// Workflow file body, required by the deploy step
    pub workflow_content: Option<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            scope: TargetScope::All,
            force_retry: false,
            concurrency: 1,
            pacing: None,
            ignore_billing_threshold: false,
            wait_for_completion: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
            workflow_content: None,
        }
    }
}

/// Final state of one account in a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReport {
    pub account: String,
    pub state: OperationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_class: Option<FailureClass>,
}

/// Aggregate of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub run_id: String,
    pub operation: OperationKind,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Run stopped early; accounts never started are absent from `reports`
    pub cancelled: bool,
    pub reports: Vec<AccountReport>,
}

impl BatchResult {
    pub fn new(run_id: impl Into<String>, operation: OperationKind) -> Self {
        Self {
            run_id: run_id.into(),
            operation,
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            cancelled: false,
            reports: Vec::new(),
        }
    }

    pub fn push(&mut self, report: AccountReport) {
        self.total += 1;
        match report.state {
            OperationState::Succeeded => self.succeeded += 1,
            OperationState::Failed => self.failed += 1,
            OperationState::Skipped => self.skipped += 1,
            OperationState::Pending | OperationState::InFlight => {}
        }
        self.reports.push(report);
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &AccountReport> {
        self.reports
            .iter()
            .filter(|r| r.state == OperationState::Failed)
    }
}

/// Cooperative cancellation shared between a caller and a running batch.
///
/// Checked before each account starts and between workflow status polls.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
