//! GitHub client factory abstract Trait

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use datagram_orchestrator_github::{create_client, ClientOptions, GithubApi};

use crate::error::CoreResult;
use crate::utils::fingerprint::fingerprint;

/// Client Factory Trait
///
/// Hands out a [`GithubApi`] acting as the owner of a token.
/// Provides a default caching implementation, `GithubClientFactory`.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Get a client for a token
    ///
    /// # Arguments
    /// * `token` - Raw token value
    async fn client_for(&self, token: &str) -> CoreResult<Arc<dyn GithubApi>>;
}

/// Caching GitHub client factory
///
/// Clients are built once per token and indexed by token fingerprint.
#[derive(Clone)]
pub struct GithubClientFactory {
    options: ClientOptions,
    clients: Arc<RwLock<HashMap<String, Arc<dyn GithubApi>>>>,
}

impl GithubClientFactory {
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for GithubClientFactory {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

#[async_trait]
impl ClientFactory for GithubClientFactory {
    async fn client_for(&self, token: &str) -> CoreResult<Arc<dyn GithubApi>> {
        let key = fingerprint(token);
        if let Some(client) = self.clients.read().await.get(&key) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }
        let client = create_client(token, &self.options)?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}
