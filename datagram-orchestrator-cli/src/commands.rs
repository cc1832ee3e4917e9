//! Subcommand dispatch onto the `AppState` command surface

use std::collections::VecDeque;
use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use datagram_orchestrator_app::AppState;
use datagram_orchestrator_core::types::{
    ApiKeyStatus, BatchOptions, CacheScope, CancellationFlag, CredentialKind, MaskedCredential,
    OperationKind,
};
use serde::Serialize;

use crate::cli::{Command, RunArgs};
use crate::render;

/// Everything `keys` shows.
#[derive(Debug, Serialize)]
struct StoredKeys {
    tokens: Vec<MaskedCredential>,
    api_keys: ApiKeyStatus,
}

pub async fn execute(
    state: &AppState,
    command: Command,
    json: bool,
    cancel: &CancellationFlag,
) -> anyhow::Result<()> {
    match command {
        Command::Init {
            username,
            repo,
            token,
        } => {
            let config = state
                .initialize_configuration(&username, &repo, &token)
                .await?;
            render::emit(json, &config, render::config)
        }
        Command::ImportKeys { file } => import(state, CredentialKind::ApiKey, &file, json).await,
        Command::ImportTokens { file } => {
            import(state, CredentialKind::GithubToken, &file, json).await
        }
        Command::Keys => {
            let keys = StoredKeys {
                tokens: state
                    .masked_credentials(CredentialKind::GithubToken)
                    .await?,
                api_keys: state.api_key_status().await?,
            };
            render::emit(json, &keys, |k| render::keys(&k.tokens, &k.api_keys))
        }
        Command::Validate { revalidate } => {
            let results = state.validate_tokens(revalidate).await?;
            render::emit(json, &results, |r| render::validations(r))
        }
        Command::Run(args) => run(state, args, json, cancel).await,
        Command::Status { scope } => {
            let status = state.workflow_status(scope).await?;
            render::emit(json, &status, |s| render::workflow_status(s))
        }
        Command::CacheSummary => {
            let summary = state.cache_summary().await?;
            render::emit(json, &summary, render::cache_summary)
        }
        Command::Logs { tail } => {
            let lines = state.logs().await?;
            let lines: Vec<String> = match tail {
                Some(n) => {
                    let mut last = VecDeque::with_capacity(n.saturating_add(1));
                    for line in lines {
                        last.push_back(line);
                        if last.len() > n {
                            last.pop_front();
                        }
                    }
                    last.into()
                }
                None => lines.collect(),
            };
            render::emit(json, &lines, |l| render::log_lines(l))
        }
        Command::CleanCache { scope, yes } => {
            let confirmed = yes || (!json && confirm(scope)?);
            let removed = state.clean_cache(confirmed, scope).await?;
            render::emit(json, &removed, |n| render::cleaned(*n, confirmed))
        }
    }
}

async fn import(
    state: &AppState,
    kind: CredentialKind,
    file: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let source = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let count = state.import_credentials(kind, &source).await?;
    render::emit(json, &count, |n| render::imported(*n, kind))
}

async fn run(
    state: &AppState,
    args: RunArgs,
    json: bool,
    cancel: &CancellationFlag,
) -> anyhow::Result<()> {
    let kind = OperationKind::from(args.operation);
    let workflow_content = match &args.workflow {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read workflow file {}", path.display()))?,
        ),
        None => None,
    };

    let options = BatchOptions {
        scope: args.scope,
        force_retry: args.retry,
        concurrency: usize::from(args.concurrency),
        pacing: args.delay_ms.map(Duration::from_millis),
        ignore_billing_threshold: args.ignore_billing,
        wait_for_completion: args.wait,
        poll_interval: Duration::from_secs(args.poll_secs),
        workflow_content,
        ..BatchOptions::default()
    };

    let result = state.run_batch_operation(kind, options, cancel).await?;
    render::emit(json, &result, render::batch)
}

/// Ask on the terminal. Never confirms when stdin is not interactive.
fn confirm(scope: CacheScope) -> anyhow::Result<bool> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        tracing::warn!("Not a terminal, pass --yes to clean the cache");
        return Ok(false);
    }

    let mut stderr = std::io::stderr();
    write!(stderr, "Delete cache files ({scope:?})? This cannot be undone [y/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
