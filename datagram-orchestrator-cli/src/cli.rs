//! Command-line definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use datagram_orchestrator_app::paths::DATA_ROOT_ENV;
use datagram_orchestrator_core::types::{CacheScope, OperationKind, TargetScope};

/// Datagram Orchestrator command-line interface.
#[derive(Debug, Parser)]
#[command(name = "datagram-orchestrator")]
#[command(about = "Coordinate many GitHub accounts around one Datagram repository")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Data directory holding config, caches and logs
    #[arg(long, env = DATA_ROOT_ENV, global = true)]
    pub root: Option<PathBuf>,

    /// GitHub API root (GitHub Enterprise Server or a local stub)
    #[arg(long, env = "GITHUB_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Print results as JSON envelopes
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the main account, repository and token
    Init {
        #[arg(long)]
        username: String,
        #[arg(long)]
        repo: String,
        /// Main account token
        #[arg(long, env = "DATAGRAM_MAIN_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Import API keys from a file, one per line
    ImportKeys { file: PathBuf },
    /// Import GitHub tokens from a file, one per line
    ImportTokens { file: PathBuf },
    /// Show stored API keys and tokens, masked
    Keys,
    /// Check every stored GitHub token
    Validate {
        /// Ignore the token cache and ask GitHub again
        #[arg(long)]
        revalidate: bool,
    },
    /// Run one batch operation across accounts
    Run(RunArgs),
    /// Show the latest workflow runs per repository
    Status {
        #[arg(long, default_value = "all")]
        scope: TargetScope,
    },
    /// Count cached records per operation
    CacheSummary,
    /// Print the activity log
    Logs {
        /// Only the last N lines
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Delete cache files
    CleanCache {
        /// `all`, `tokens`, or an operation name
        #[arg(long, default_value = "all")]
        scope: CacheScope,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    pub operation: OperationArg,

    /// Repositories targeted by set-secret, deploy and trigger-workflow
    #[arg(long, default_value = "all")]
    pub scope: TargetScope,

    /// Run again for accounts already marked complete
    #[arg(long)]
    pub retry: bool,

    /// Accounts processed at once
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=16))]
    pub concurrency: u16,

    /// Delay before each account in milliseconds (defaults to the configured delay)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Dispatch even when Actions usage is above the billing threshold
    #[arg(long)]
    pub ignore_billing: bool,

    /// Poll dispatched workflow runs until they finish
    #[arg(long)]
    pub wait: bool,

    /// Seconds between workflow run polls
    #[arg(long, default_value_t = 30)]
    pub poll_secs: u64,

    /// Workflow file deployed by `deploy`
    #[arg(long)]
    pub workflow: Option<PathBuf>,
}

/// Batch operations, as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OperationArg {
    Invite,
    AcceptInvite,
    Fork,
    SetSecret,
    Deploy,
    TriggerWorkflow,
    ValidateToken,
}

impl From<OperationArg> for OperationKind {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Invite => Self::Invite,
            OperationArg::AcceptInvite => Self::AcceptInvite,
            OperationArg::Fork => Self::Fork,
            OperationArg::SetSecret => Self::SetSecret,
            OperationArg::Deploy => Self::Deploy,
            OperationArg::TriggerWorkflow => Self::TriggerWorkflow,
            OperationArg::ValidateToken => Self::ValidateToken,
        }
    }
}
