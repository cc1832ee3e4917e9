//! Operation kinds, outcomes and the per-account state machine

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, FailureClass};

/// A batch operation that can be run against a set of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Main account invites a collaborator to the main repository
    Invite,
    /// Collaborator accepts the pending invitation
    AcceptInvite,
    /// Collaborator forks (or syncs its fork of) the main repository
    Fork,
    /// Sealed API keys are written as an Actions secret
    SetSecret,
    /// Workflow file is committed and enabled
    Deploy,
    /// Workflow is dispatched
    TriggerWorkflow,
    /// Token is checked against the account it belongs to
    ValidateToken,
}

impl OperationKind {
    pub const ALL: [Self; 7] = [
        Self::Invite,
        Self::AcceptInvite,
        Self::Fork,
        Self::SetSecret,
        Self::Deploy,
        Self::TriggerWorkflow,
        Self::ValidateToken,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invite => "invite",
            Self::AcceptInvite => "accept-invite",
            Self::Fork => "fork",
            Self::SetSecret => "set-secret",
            Self::Deploy => "deploy",
            Self::TriggerWorkflow => "trigger-workflow",
            Self::ValidateToken => "validate-token",
        }
    }

    /// Collaboration setup steps never target the main account itself.
    #[must_use]
    pub fn excludes_main_account(self) -> bool {
        matches!(self, Self::Invite | Self::AcceptInvite | Self::Fork)
    }

    /// Steps that act on a repository selected by [`TargetScope`](super::TargetScope).
    #[must_use]
    pub fn targets_repository(self) -> bool {
        matches!(self, Self::SetSecret | Self::Deploy | Self::TriggerWorkflow)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown operation: {s}")))
    }
}

/// Terminal result of one operation against one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Succeeded,
    Failed,
    Skipped,
}

impl Outcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-(account, operation) state.
///
/// ```text
/// Pending -> InFlight -> Succeeded | Failed | Skipped
/// Pending -> Skipped                 (cache hit, billing threshold)
/// Succeeded | Failed | Skipped -> Pending   (explicit retry only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationState {
    #[default]
    Pending,
    InFlight,
    Succeeded,
    Failed,
    Skipped,
}

impl OperationState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    pub fn start(self) -> CoreResult<Self> {
        match self {
            Self::Pending => Ok(Self::InFlight),
            other => Err(other.illegal("start")),
        }
    }

    pub fn finish(self, outcome: Outcome) -> CoreResult<Self> {
        match self {
            Self::InFlight => Ok(outcome.into()),
            other => Err(other.illegal("finish")),
        }
    }

    /// Skip without contacting the remote.
    pub fn skip(self) -> CoreResult<Self> {
        match self {
            Self::Pending => Ok(Self::Skipped),
            other => Err(other.illegal("skip")),
        }
    }

    pub fn retry(self) -> CoreResult<Self> {
        if self.is_terminal() {
            Ok(Self::Pending)
        } else {
            Err(self.illegal("retry"))
        }
    }

    fn illegal(self, action: &str) -> CoreError {
        CoreError::ValidationError(format!("cannot {action} an operation in state {self:?}"))
    }
}

impl From<Outcome> for OperationState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => Self::Succeeded,
            Outcome::Failed => Self::Failed,
            Outcome::Skipped => Self::Skipped,
        }
    }
}

/// One line of the operation cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub run_id: String,
    pub account: String,
    pub operation: OperationKind,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_class: Option<FailureClass>,
    /// Written by a run started with explicit retry
    #[serde(default)]
    pub retried: bool,
    #[serde(with = "crate::utils::datetime")]
    pub timestamp: DateTime<Utc>,
}

impl OperationRecord {
    pub fn new(
        run_id: impl Into<String>,
        account: impl Into<String>,
        operation: OperationKind,
        outcome: Outcome,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            account: account.into(),
            operation,
            outcome,
            detail: None,
            failure_class: None,
            retried: false,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    #[must_use]
    pub fn with_failure_class(mut self, class: Option<FailureClass>) -> Self {
        self.failure_class = class;
        self
    }

    #[must_use]
    pub fn retried(mut self, retried: bool) -> Self {
        self.retried = retried;
        self
    }
}

/// Authoritative completion per (account, operation), rebuilt by replaying records in order.
///
/// A success marks the pair complete. A later non-success only clears it when it was
/// written by an explicit retry, so a stray failure can never undo finished work.
#[derive(Debug, Clone, Default)]
pub struct CompletionIndex {
    completed: HashMap<(String, OperationKind), bool>,
}

impl CompletionIndex {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a OperationRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.apply(record);
        }
        index
    }

    pub fn apply(&mut self, record: &OperationRecord) {
        let key = (record.account.to_ascii_lowercase(), record.operation);
        match record.outcome {
            Outcome::Succeeded => {
                self.completed.insert(key, true);
            }
            _ if record.retried => {
                self.completed.insert(key, false);
            }
            _ => {}
        }
    }

    #[must_use]
    pub fn is_completed(&self, account: &str, operation: OperationKind) -> bool {
        self.completed
            .get(&(account.to_ascii_lowercase(), operation))
            .copied()
            .unwrap_or(false)
    }

    /// Accounts that have completed `operation`.
    pub fn completed_accounts(&self, operation: OperationKind) -> impl Iterator<Item = &str> {
        self.completed
            .iter()
            .filter(move |((_, kind), done)| **done && *kind == operation)
            .map(|((account, _), _)| account.as_str())
    }
}
