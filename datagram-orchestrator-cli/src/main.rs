//! Command-line entry point for Datagram Orchestrator
//!
//! Results go to stdout (plain text or `--json` envelopes); logs go to stderr.
//! Ctrl-C during a batch run lets in-flight accounts finish and starts no new ones.

mod cli;
mod commands;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use datagram_orchestrator_app::paths::DATA_DIR_NAME;
use datagram_orchestrator_app::{AppState, StoragePaths};
use datagram_orchestrator_core::types::CancellationFlag;
use datagram_orchestrator_core::CoreError;
use datagram_orchestrator_github::ClientOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs to stderr so stdout stays parseable
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(cli.verbose),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();

    let json = cli.json;
    let state = match open_state(cli.root, cli.api_url) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to start: {e:#}");
            render::error(json, &e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight accounts");
            on_interrupt.cancel();
        }
    });

    match commands::execute(&state, cli.command, json, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            match e.downcast_ref::<CoreError>() {
                Some(core) if core.is_expected() => tracing::warn!("{core}"),
                Some(core) => tracing::error!("{core}"),
                None => tracing::error!("{e:#}"),
            }
            render::error(json, &e);
            code
        }
    }
}

/// 1 for setup errors (missing or corrupt stores, no usable credentials),
/// 2 for a command that was refused or failed remotely.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<CoreError>() {
        Some(core) if !core.aborts_run() => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn open_state(root: Option<PathBuf>, api_url: Option<String>) -> anyhow::Result<AppState> {
    let root = root
        .or_else(|| dirs::data_dir().map(|dir| dir.join(DATA_DIR_NAME)))
        .context("no data directory available, pass --root or set DATAGRAM_HOME")?;

    let mut options = ClientOptions::default();
    if let Some(url) = api_url {
        options.base_url = url.trim_end_matches('/').to_string();
    }

    Ok(AppState::open(StoragePaths::new(root), options)?)
}
