//! GitHub REST client

mod api;
mod error;
mod http;

use std::time::Duration;

use reqwest::Client;

use crate::error::{GithubError, Result};
use crate::http_client::RetryPolicy;

pub(crate) const GITHUB_API_BASE: &str = "https://api.github.com";
pub(crate) const GITHUB_API_VERSION: &str = "2022-11-28";
pub(crate) const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Default connect timeout (seconds)
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default request timeout (seconds)
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Transport settings shared by every client a factory creates.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API root, without trailing slash. Point at a GHES instance or a local stub.
    pub base_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: GITHUB_API_BASE.to_string(),
            user_agent: concat!("datagram-orchestrator/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

/// GitHub client bound to a single token.
pub struct GithubClient {
    pub(crate) client: Client,
    pub(crate) token: String,
    pub(crate) options: ClientOptions,
}

impl GithubClient {
    pub fn new(token: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| GithubError::NetworkError {
                detail: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            token: token.into(),
            options,
        })
    }
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("base_url", &self.options.base_url)
            .finish_non_exhaustive()
    }
}
