//! Client factory

use std::sync::Arc;

use crate::client::{ClientOptions, GithubClient};
use crate::error::Result;
use crate::traits::GithubApi;

/// Creates a [`GithubApi`] client acting as the owner of `token`.
///
/// The client is wrapped in `Arc<dyn GithubApi>` so it can be shared across tasks.
///
/// # Examples
///
/// ```rust,no_run
/// use datagram_orchestrator_github::{create_client, ClientOptions};
///
/// # async fn example() -> datagram_orchestrator_github::Result<()> {
/// let client = create_client("ghp_xxx", &ClientOptions::default())?;
/// let me = client.authenticated_user().await?;
/// println!("{}", me.login);
/// # Ok(())
/// # }
/// ```
pub fn create_client(
    token: impl Into<String>,
    options: &ClientOptions,
) -> Result<Arc<dyn GithubApi>> {
    Ok(Arc::new(GithubClient::new(token, options.clone())?))
}
