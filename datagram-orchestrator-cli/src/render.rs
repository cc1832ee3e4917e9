//! Terminal and JSON output

use datagram_orchestrator_core::types::{
    ApiKeyStatus, BatchResult, CacheSummary, CommandResult, CredentialKind, MaskedCredential,
    ConfigView, OperationState, RepoWorkflowStatus, TokenValidation,
};
use datagram_orchestrator_core::CoreError;
use serde::Serialize;

/// Print `data` as a success envelope, or through `human` for the terminal.
pub fn emit<T: Serialize>(
    json: bool,
    data: &T,
    human: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&CommandResult::success(data))?
        );
    } else {
        println!("{}", human(data));
    }
    Ok(())
}

/// JSON envelope for a failed command. Core errors keep their code.
///
/// Terminal mode has nothing to add here: the error is already logged on stderr.
pub fn error(json: bool, err: &anyhow::Error) {
    if !json {
        return;
    }
    let envelope = error_envelope(err);
    match serde_json::to_string_pretty(&envelope) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::error!("Failed to encode error envelope: {e}"),
    }
}

fn error_envelope(err: &anyhow::Error) -> CommandResult<()> {
    let error = err
        .downcast_ref::<CoreError>()
        .cloned()
        .unwrap_or_else(|| CoreError::ValidationError(format!("{err:#}")));
    CommandResult::Error { error }
}

pub fn imported(count: usize, kind: CredentialKind) -> String {
    format!("Imported {count} {kind} value(s)")
}

pub fn config(config: &ConfigView) -> String {
    [
        format!("Main repository:   {}", config.main_repo()),
        format!("Main token:        {}", config.main_token),
        format!("Secret name:       {}", config.secret_name),
        format!(
            "Workflow:          {} @ {}",
            config.workflow_path(),
            config.workflow_ref
        ),
        format!("Billing threshold: {} min", config.billing_threshold_minutes),
        format!("Request delay:     {} ms", config.request_delay_ms),
    ]
    .join("\n")
}

pub fn keys(tokens: &[MaskedCredential], api_keys: &ApiKeyStatus) -> String {
    let mut lines = vec![format!("GitHub tokens: {}", tokens.len())];
    lines.extend(
        tokens
            .iter()
            .enumerate()
            .map(|(i, t)| format!("  {:>3}. {}", i + 1, t.masked)),
    );
    lines.push(format!("API keys: {}", api_keys.count));
    lines.extend(api_keys.preview.iter().map(|k| format!("       {k}")));
    if api_keys.count > api_keys.preview.len() {
        lines.push(format!(
            "       ... and {} more",
            api_keys.count - api_keys.preview.len()
        ));
    }
    lines.join("\n")
}

pub fn validations(results: &[TokenValidation]) -> String {
    let mut lines: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let who = r.username.as_deref().unwrap_or("-");
            let cached = if r.cached { " (cached)" } else { "" };
            format!("  {:>3}. {}  {:<15} {who}{cached}", i + 1, r.masked, r.status)
        })
        .collect();
    let valid = results.iter().filter(|r| r.status.is_valid()).count();
    lines.push(format!("{valid}/{} token(s) valid", results.len()));
    lines.join("\n")
}

pub fn batch(result: &BatchResult) -> String {
    let mut lines = vec![format!(
        "{}: {} succeeded, {} failed, {} skipped ({} total)",
        result.operation, result.succeeded, result.failed, result.skipped, result.total
    )];
    for report in result.failures() {
        let class = report
            .failure_class
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        lines.push(format!(
            "  failed  {}{class}: {}",
            report.account,
            report.detail.as_deref().unwrap_or("no detail")
        ));
    }
    for report in result
        .reports
        .iter()
        .filter(|r| r.state == OperationState::Skipped)
    {
        if let Some(detail) = &report.detail {
            lines.push(format!("  skipped {}: {detail}", report.account));
        }
    }
    if result.cancelled {
        lines.push("Cancelled: remaining accounts were not started".to_string());
    }
    lines.join("\n")
}

pub fn workflow_status(repos: &[RepoWorkflowStatus]) -> String {
    let mut lines = Vec::new();
    for repo in repos {
        lines.push(format!("{} ({})", repo.repository, repo.account));
        if let Some(error) = &repo.error {
            lines.push(format!("  error: {error}"));
            continue;
        }
        if repo.runs.is_empty() {
            lines.push("  no runs".to_string());
        }
        for run in &repo.runs {
            let state = run
                .conclusion
                .as_deref()
                .or(run.status.as_deref())
                .unwrap_or("unknown");
            lines.push(format!(
                "  #{} {state:<11} {} {}",
                run.id,
                run.created_at.format("%Y-%m-%d %H:%M"),
                run.event
            ));
        }
    }
    if lines.is_empty() {
        lines.push("No repositories in scope".to_string());
    }
    lines.join("\n")
}

pub fn cache_summary(summary: &CacheSummary) -> String {
    let mut lines = vec![format!("Validated accounts: {}", summary.accounts)];
    if summary.operations.is_empty() {
        lines.push("No operation records".to_string());
    }
    for op in &summary.operations {
        lines.push(format!(
            "  {:<17} {} record(s): {} complete, {} failed, {} skipped",
            op.operation.as_str(),
            op.records,
            op.completed,
            op.failed,
            op.skipped
        ));
    }
    lines.join("\n")
}

pub fn log_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        return "Activity log is empty".to_string();
    }
    lines.join("\n")
}

pub fn cleaned(removed: usize, confirmed: bool) -> String {
    if confirmed {
        format!("Removed {removed} cache file(s)")
    } else {
        "Not confirmed, cache left untouched".to_string()
    }
}
