//! Batch orchestration
//!
//! Applies one operation kind to every target account in input order, skipping
//! accounts the operation cache already marks as completed. Per-account failures are
//! recorded and reported; only setup and storage errors abort the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{CoreError, CoreResult};
use crate::services::{OperationExecutor, ServiceContext};
use crate::types::{
    Account, AccountReport, BatchOptions, BatchResult, CancellationFlag, OperationKind,
    OperationRecord, OperationState, OrchestratorConfig, Outcome, TargetScope,
};

/// Batch orchestrator
pub struct BatchOrchestrator {
    ctx: Arc<ServiceContext>,
}

/// Per-run values shared by every account task.
struct RunScope<'a> {
    run_id: &'a str,
    kind: OperationKind,
    options: &'a BatchOptions,
    pacer: Pacer,
    executor: &'a OperationExecutor,
    cancel: &'a CancellationFlag,
    /// Raised internally after a storage failure so no further accounts start
    halt: CancellationFlag,
}

impl RunScope<'_> {
    fn stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.halt.is_cancelled()
    }
}

/// Spaces account starts at least `interval` apart across all in-flight tasks.
struct Pacer {
    interval: Duration,
    next_start: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_start: Mutex::new(None),
        }
    }

    /// Wait for the next start slot. The lock is held while sleeping so
    /// concurrent tasks queue up behind each other.
    async fn wait_turn(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut next_start = self.next_start.lock().await;
        if let Some(at) = *next_start {
            tokio::time::sleep_until(at).await;
        }
        *next_start = Some(Instant::now() + self.interval);
    }
}

impl BatchOrchestrator {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Run `kind` against the accounts selected by `options.scope`
    ///
    /// # Returns
    /// A result covering every account that was started. Accounts never started
    /// because of cancellation are absent and `cancelled` is set.
    pub async fn run(
        &self,
        kind: OperationKind,
        options: BatchOptions,
        cancel: &CancellationFlag,
    ) -> CoreResult<BatchResult> {
        let config = self.ctx.require_config().await?;
        let targets = resolve_targets(&self.ctx, &config, kind, options.scope).await?;
        let pacing = options.pacing.unwrap_or_else(|| config.request_delay());
        let concurrency = options.concurrency.max(1);
        let executor = OperationExecutor::prepare(
            self.ctx.clone(),
            config,
            kind,
            options.clone(),
            cancel.clone(),
        )
        .await?;

        let run_id = uuid::Uuid::new_v4().to_string();
        log::info!(
            "Run {run_id}: {kind} for {} account(s), concurrency {concurrency}{}",
            targets.len(),
            if options.force_retry { ", retrying" } else { "" }
        );
        self.ctx
            .record_activity(&format!(
                "Run {run_id}: {kind} started for {} account(s)",
                targets.len()
            ))
            .await;

        let scope = RunScope {
            run_id: &run_id,
            kind,
            options: &options,
            pacer: Pacer::new(pacing),
            executor: &executor,
            cancel,
            halt: CancellationFlag::new(),
        };
        let scope = &scope;

        let mut result = BatchResult::new(&run_id, kind);
        let mut first_error: Option<CoreError> = None;
        let mut reports = stream::iter(targets)
            .map(move |account| self.process_account(scope, account))
            .buffered(concurrency);

        while let Some(report) = reports.next().await {
            match report {
                Ok(Some(report)) => result.push(report),
                Ok(None) => result.cancelled = true,
                Err(e) => {
                    log::error!("Run {run_id} aborted: {e}");
                    scope.halt.cancel();
                    first_error.get_or_insert(e);
                }
            }
        }
        drop(reports);

        if let Some(e) = first_error {
            self.ctx
                .record_activity(&format!("Run {run_id}: {kind} aborted: {e}"))
                .await;
            return Err(e);
        }

        let summary = format!(
            "Run {run_id}: {kind} finished: {} succeeded, {} failed, {} skipped{}",
            result.succeeded,
            result.failed,
            result.skipped,
            if result.cancelled { " (cancelled)" } else { "" }
        );
        log::info!("{summary}");
        self.ctx.record_activity(&summary).await;
        Ok(result)
    }

    /// Process one account
    ///
    /// # Returns
    /// * `Ok(None)` - not started because the run was stopped
    /// * `Err(_)` - a storage error that aborts the run
    async fn process_account(
        &self,
        scope: &RunScope<'_>,
        account: Account,
    ) -> CoreResult<Option<AccountReport>> {
        if scope.stopped() {
            return Ok(None);
        }
        let kind = scope.kind;
        let cache = self.ctx.operation_cache();
        let mut state = OperationState::Pending;

        let completed = cache.has_completed(&account.username, kind).await?;
        if completed && scope.options.force_retry {
            state = OperationState::Succeeded.retry()?;
            log::debug!("{kind} for {} already completed, retrying", account.username);
        } else if completed {
            state = state.skip()?;
            log::debug!("{kind} for {} already completed, skipping", account.username);
            self.ctx
                .record_activity(&format!(
                    "Run {}: {kind} {} skipped (already completed)",
                    scope.run_id, account.username
                ))
                .await;
            return Ok(Some(AccountReport {
                account: account.username,
                state,
                detail: Some("already completed".to_string()),
                failure_class: None,
            }));
        }

        scope.pacer.wait_turn().await;
        if scope.stopped() {
            return Ok(None);
        }

        state = state.start()?;
        let (outcome, detail, failure_class) =
            match scope.executor.execute(kind, &account).await {
                Ok(step) => (step.outcome, step.detail, None),
                Err(e) if e.aborts_run() => return Err(e),
                Err(e) => {
                    if e.is_expected() {
                        log::warn!("{kind} failed for {}: {e}", account.username);
                    } else {
                        log::error!("{kind} failed for {}: {e}", account.username);
                    }
                    (Outcome::Failed, Some(e.to_string()), e.failure_class())
                }
            };
        state = state.finish(outcome)?;

        let record = OperationRecord::new(scope.run_id, &account.username, kind, outcome)
            .with_detail(detail.clone())
            .with_failure_class(failure_class)
            .retried(scope.options.force_retry);
        cache.record_outcome(&record).await?;

        self.ctx
            .record_activity(&format!(
                "Run {}: {kind} {} {outcome}{}",
                scope.run_id,
                account.username,
                detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
            ))
            .await;

        Ok(Some(AccountReport {
            account: account.username,
            state,
            detail,
            failure_class,
        }))
    }
}

/// Accounts a run of `kind` acts on, in directory order
///
/// Collaboration setup steps (`invite`, `accept-invite`, `fork`) target every
/// validated collaborator. Repository steps target the main account and/or
/// collaborators that completed `fork`, per `scope`. `validate-token` targets every
/// validated account.
pub(crate) async fn resolve_targets(
    ctx: &ServiceContext,
    config: &OrchestratorConfig,
    kind: OperationKind,
    scope: TargetScope,
) -> CoreResult<Vec<Account>> {
    let mut seen = HashSet::new();
    let validated: Vec<Account> = ctx
        .account_repository()
        .find_all()
        .await?
        .into_iter()
        .filter(|a| seen.insert(a.username.to_ascii_lowercase()))
        .collect();

    let targets = if kind == OperationKind::ValidateToken {
        validated
    } else if kind.targets_repository() {
        let mut targets = Vec::new();
        if scope.includes_main() {
            targets.push(config.main_account());
        }
        if scope.includes_collaborators() {
            for account in validated {
                if config.is_main_account(&account.username) {
                    continue;
                }
                if ctx
                    .operation_cache()
                    .has_completed(&account.username, OperationKind::Fork)
                    .await?
                {
                    targets.push(account);
                }
            }
        }
        targets
    } else {
        validated
            .into_iter()
            .filter(|a| !(kind.excludes_main_account() && config.is_main_account(&a.username)))
            .collect()
    };

    if targets.is_empty() {
        return Err(CoreError::NoValidCredentials(format!(
            "no target accounts for {kind}; import and validate tokens first"
        )));
    }
    Ok(targets)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{FailureClass, GithubError};
    use crate::test_utils::{create_test_harness, seed_collaborators, token_for, TestHarness};
    use crate::traits::{AccountRepository, OperationCache};

    fn options() -> BatchOptions {
        BatchOptions {
            pacing: Some(Duration::ZERO),
            poll_interval: Duration::from_millis(1),
            ..BatchOptions::default()
        }
    }

    fn rejected() -> GithubError {
        GithubError::ValidationFailed {
            raw_message: "Invitee is not a valid user".into(),
        }
    }

    async fn run(h: &TestHarness, kind: OperationKind, options: BatchOptions) -> BatchResult {
        BatchOrchestrator::new(h.ctx.clone())
            .run(kind, options, &CancellationFlag::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn remote_rejection_does_not_stop_batch() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice", "bob", "carol"], false).await;
        h.github.fail_invite("bob", rejected());

        let result = run(&h, OperationKind::Invite, options()).await;

        assert_eq!(
            (result.total, result.succeeded, result.failed, result.skipped),
            (3, 2, 1, 0)
        );
        let accounts: Vec<&str> = result.reports.iter().map(|r| r.account.as_str()).collect();
        assert_eq!(accounts, vec!["alice", "bob", "carol"]);
        assert_eq!(
            result.reports[1].failure_class,
            Some(FailureClass::RemoteRejected)
        );

        assert_eq!(
            h.cache.last_outcome("alice", OperationKind::Invite).await,
            Some(Outcome::Succeeded)
        );
        assert_eq!(
            h.cache.last_outcome("bob", OperationKind::Invite).await,
            Some(Outcome::Failed)
        );
        assert_eq!(
            h.cache.last_outcome("carol", OperationKind::Invite).await,
            Some(Outcome::Succeeded)
        );
        assert_eq!(h.github.call_count("invite"), 3);
    }

    #[tokio::test]
    async fn second_run_skips_everything() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice", "bob", "carol"], false).await;

        let first = run(&h, OperationKind::Invite, options()).await;
        assert_eq!(first.succeeded, 3);

        let second = run(&h, OperationKind::Invite, options()).await;
        assert_eq!(second.succeeded, 0);
        assert_eq!(second.skipped, second.total);
        assert_eq!(second.total, 3);
        assert_eq!(h.github.call_count("invite"), 3);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn rerun_attempts_only_failed_accounts() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice", "bob"], false).await;
        h.github.fail_invite("bob", rejected());
        run(&h, OperationKind::Invite, options()).await;

        h.github.fail_invite(
            "alice",
            GithubError::InvalidCredentials { raw_message: None },
        );
        let second = run(&h, OperationKind::Invite, options()).await;

        assert_eq!(second.skipped, 1);
        assert_eq!(second.failed, 1);
        assert_eq!(second.reports[1].account, "bob");
    }

    #[tokio::test]
    async fn force_retry_reruns_and_marks_records() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice"], false).await;
        run(&h, OperationKind::Invite, options()).await;

        h.github.fail_invite("alice", rejected());
        let retried = run(
            &h,
            OperationKind::Invite,
            BatchOptions {
                force_retry: true,
                ..options()
            },
        )
        .await;

        assert_eq!(retried.failed, 1);
        let records = h.cache.records(OperationKind::Invite).await.unwrap();
        assert!(records.last().unwrap().retried);
        // a failed explicit retry clears the earlier success
        assert!(!h
            .cache
            .has_completed("alice", OperationKind::Invite)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn cancellation_finishes_in_flight_account_only() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice", "bob", "carol"], false).await;
        let cancel = CancellationFlag::new();
        h.github.cancel_on("invite alice", &cancel);

        let result = BatchOrchestrator::new(h.ctx.clone())
            .run(OperationKind::Invite, options(), &cancel)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.total, 1);
        assert_eq!(result.succeeded, 1);
        assert_eq!(
            h.cache.last_outcome("alice", OperationKind::Invite).await,
            Some(Outcome::Succeeded)
        );
        assert_eq!(h.cache.last_outcome("bob", OperationKind::Invite).await, None);
        assert_eq!(h.github.call_count("invite"), 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice"], false).await;
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let result = BatchOrchestrator::new(h.ctx.clone())
            .run(OperationKind::Invite, options(), &cancel)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.total, 0);
        assert!(h.github.calls().iter().all(|c| !c.starts_with("invite")));
    }

    #[tokio::test]
    async fn storage_failure_aborts_run() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice", "bob"], false).await;
        h.cache
            .set_record_error(Some(CoreError::StorageError("disk full".into())))
            .await;

        let result = BatchOrchestrator::new(h.ctx.clone())
            .run(OperationKind::Invite, options(), &CancellationFlag::new())
            .await;

        let err = result.unwrap_err();
        assert!(err.aborts_run());
        assert_eq!(h.github.call_count("invite"), 1);
    }

    #[tokio::test]
    async fn concurrent_run_keeps_input_order() {
        let h = create_test_harness();
        let names = ["a1", "a2", "a3", "a4", "a5", "a6"];
        seed_collaborators(&h, &names, false).await;

        let result = run(
            &h,
            OperationKind::Invite,
            BatchOptions {
                concurrency: 3,
                ..options()
            },
        )
        .await;

        assert_eq!(result.succeeded, 6);
        let order: Vec<&str> = result.reports.iter().map(|r| r.account.as_str()).collect();
        assert_eq!(order, names);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_bounds_starts_across_concurrent_tasks() {
        let h = create_test_harness();
        seed_collaborators(&h, &["a1", "a2", "a3", "a4", "a5", "a6"], false).await;
        let pacing = Duration::from_millis(200);

        let started = Instant::now();
        let result = run(
            &h,
            OperationKind::Invite,
            BatchOptions {
                concurrency: 3,
                pacing: Some(pacing),
                ..options()
            },
        )
        .await;

        assert_eq!(result.succeeded, 6);
        assert!(started.elapsed() >= pacing * 5);
    }

    #[tokio::test(start_paused = true)]
    async fn first_account_starts_without_delay() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice"], false).await;

        let started = Instant::now();
        run(
            &h,
            OperationKind::Invite,
            BatchOptions {
                pacing: Some(Duration::from_secs(10)),
                ..options()
            },
        )
        .await;

        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn uninitialized_run_is_configuration_missing() {
        let h = create_test_harness();
        let result = BatchOrchestrator::new(h.ctx.clone())
            .run(OperationKind::Invite, options(), &CancellationFlag::new())
            .await;
        assert!(matches!(result, Err(CoreError::ConfigurationMissing(_))));
    }

    #[tokio::test]
    async fn invite_without_collaborators_has_no_targets() {
        let h = create_test_harness();
        seed_collaborators(&h, &[], false).await;
        let result = BatchOrchestrator::new(h.ctx.clone())
            .run(OperationKind::Invite, options(), &CancellationFlag::new())
            .await;
        assert!(matches!(result, Err(CoreError::NoValidCredentials(_))));
    }

    #[tokio::test]
    async fn repository_scope_selects_targets() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice"], true).await;
        seed_collaborators(&h, &["bob"], false).await;
        let config = h.ctx.require_config().await.unwrap();

        let names = |targets: Vec<Account>| -> Vec<String> {
            targets.into_iter().map(|a| a.username).collect()
        };
        let kind = OperationKind::SetSecret;
        let all = resolve_targets(&h.ctx, &config, kind, TargetScope::All)
            .await
            .unwrap();
        assert_eq!(names(all), vec!["owner", "alice"]);
        let main = resolve_targets(&h.ctx, &config, kind, TargetScope::Main)
            .await
            .unwrap();
        assert_eq!(names(main), vec!["owner"]);
        let collaborators = resolve_targets(&h.ctx, &config, kind, TargetScope::Collaborators)
            .await
            .unwrap();
        assert_eq!(names(collaborators), vec!["alice"]);

        let invite = resolve_targets(&h.ctx, &config, OperationKind::Invite, TargetScope::Main)
            .await
            .unwrap();
        assert_eq!(names(invite), vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn setup_steps_skip_validated_main_account() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice"], false).await;
        h.accounts
            .save(&Account::new("Owner", token_for("owner")))
            .await
            .unwrap();
        let config = h.ctx.require_config().await.unwrap();

        let names = |targets: Vec<Account>| -> Vec<String> {
            targets.into_iter().map(|a| a.username).collect()
        };
        for kind in [OperationKind::Invite, OperationKind::AcceptInvite, OperationKind::Fork] {
            let targets = resolve_targets(&h.ctx, &config, kind, TargetScope::All)
                .await
                .unwrap();
            assert_eq!(names(targets), vec!["alice"]);
        }
        let validate =
            resolve_targets(&h.ctx, &config, OperationKind::ValidateToken, TargetScope::All)
                .await
                .unwrap();
        assert_eq!(names(validate), vec!["alice", "Owner"]);
    }

    #[tokio::test]
    async fn activity_log_records_each_outcome() {
        let h = create_test_harness();
        seed_collaborators(&h, &["alice", "bob"], false).await;
        h.github.fail_invite("bob", rejected());
        run(&h, OperationKind::Invite, options()).await;

        let lines = h.activity.entries().await;
        assert!(lines.iter().any(|l| l.contains("invite alice succeeded")));
        assert!(lines.iter().any(|l| l.contains("invite bob failed")));
        assert!(lines
            .last()
            .unwrap()
            .contains("1 succeeded, 1 failed, 0 skipped"));
    }
}
