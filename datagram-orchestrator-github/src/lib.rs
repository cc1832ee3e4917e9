//! # datagram-orchestrator-github
//!
//! A retrying GitHub REST client covering the calls needed to coordinate many
//! accounts around one repository: collaborator invitations, forks, Actions
//! secrets, workflow deployment and dispatch, and billing usage.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use datagram_orchestrator_github::{create_client, ClientOptions, RepoRef};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = create_client("ghp_xxx", &ClientOptions::default())?;
//!
//!     let me = client.authenticated_user().await?;
//!     let repo = RepoRef::new(&me.login, "datagram");
//!     for run in client.list_workflow_runs(&repo, 3).await? {
//!         println!("{} {:?} {:?}", run.id, run.status, run.conclusion);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, GithubError>`](GithubError). Every error has a
//! [`FailureClass`]:
//!
//! - `Auth`: the token was rejected or lacks permission (never retried)
//! - `RateLimited`: primary or secondary limit hit (retried, honouring retry-after)
//! - `TransientNetwork`: timeouts, connection failures, 5xx (retried for idempotent calls)
//! - `RemoteRejected`: missing resources, validation failures (never retried)
//!
//! POST calls (fork, merge-upstream, workflow dispatch) are only retried on rate
//! limits, because a transport failure leaves it unknown whether the side effect landed.

mod client;
mod crypto;
mod error;
mod factory;
mod http_client;
mod traits;
mod types;
mod utils;

pub use client::{ClientOptions, GithubClient};
pub use crypto::seal_secret;
pub use error::{FailureClass, GithubError, Result};
pub use factory::create_client;
pub use http_client::RetryPolicy;
pub use traits::GithubApi;
pub use types::{
    AuthenticatedUser, ContentFile, InvitationRepository, InviteStatus, MergeUpstreamStatus,
    ParentRepository, PutFileRequest, RepoRef, Repository, RepositoryInvitation, SecretInfo,
    SecretPublicKey, Workflow, WorkflowRun,
};

pub use utils::log_sanitizer;
