//! Orchestrator configuration

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::{Account, OrchestratorConfig};

/// Configuration service
pub struct ConfigService {
    ctx: Arc<ServiceContext>,
}

impl ConfigService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Set the main account and repository
    ///
    /// The main token is checked remotely and must belong to `username`. Tuning
    /// values from an existing configuration are kept.
    pub async fn initialize(
        &self,
        username: &str,
        repo_name: &str,
        token: &str,
    ) -> CoreResult<OrchestratorConfig> {
        let mut config = OrchestratorConfig::new(username.trim(), repo_name.trim(), token.trim());
        config.validate()?;

        let client = self.ctx.client_for(&config.main_token).await?;
        let user = client.authenticated_user().await?;
        if !config.is_main_account(&user.login) {
            return Err(CoreError::ValidationError(format!(
                "main token belongs to {}, not {}",
                user.login, config.main_account_username
            )));
        }
        config.main_account_username.clone_from(&user.login);

        // An unreadable previous config is simply replaced
        if let Ok(Some(existing)) = self.ctx.config_repository().load().await {
            config = OrchestratorConfig {
                main_account_username: config.main_account_username,
                main_repo_name: config.main_repo_name,
                main_token: config.main_token,
                ..existing
            };
        }
        self.ctx.config_repository().save(&config).await?;
        self.ctx
            .account_repository()
            .save(&Account::new(&user.login, &config.main_token).with_scopes(user.scopes))
            .await?;

        log::info!("Configured main repository {}", config.main_repo());
        self.ctx
            .record_activity(&format!(
                "Configured main repository {} (token {})",
                config.main_repo(),
                config.main_account().masked_token()
            ))
            .await;
        Ok(config)
    }

    pub async fn get(&self) -> CoreResult<OrchestratorConfig> {
        self.ctx.require_config().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::GithubError;
    use crate::test_utils::{create_test_harness, token_for};
    use crate::traits::{AccountRepository, ConfigRepository};

    #[tokio::test]
    async fn initialize_validates_main_token() {
        let h = create_test_harness();
        h.github.add_user(&token_for("Owner"), "Owner");
        let svc = ConfigService::new(h.ctx.clone());

        let config = svc
            .initialize("owner", "datagram", &token_for("Owner"))
            .await
            .unwrap();

        assert_eq!(config.main_account_username, "Owner");
        assert!(h.config.load().await.unwrap().is_some());
        assert_eq!(h.accounts.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn initialize_rejects_foreign_token() {
        let h = create_test_harness();
        h.github.add_user(&token_for("someone"), "someone");
        let svc = ConfigService::new(h.ctx.clone());

        let result = svc
            .initialize("owner", "datagram", &token_for("someone"))
            .await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert!(h.config.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn initialize_surfaces_auth_errors() {
        let h = create_test_harness();
        h.github.fail_user(
            &token_for("owner"),
            GithubError::InvalidCredentials { raw_message: None },
        );
        let result = ConfigService::new(h.ctx.clone())
            .initialize("owner", "datagram", &token_for("owner"))
            .await;
        assert!(matches!(result, Err(CoreError::AuthError(_))));
    }

    #[tokio::test]
    async fn reinitialize_keeps_tuning() {
        let h = create_test_harness();
        h.github.add_user(&token_for("owner"), "owner");
        let mut existing = OrchestratorConfig::new("old", "old-repo", token_for("old"));
        existing.request_delay_ms = 10;
        h.config.save(&existing).await.unwrap();

        let config = ConfigService::new(h.ctx.clone())
            .initialize("owner", "datagram", &token_for("owner"))
            .await
            .unwrap();
        assert_eq!(config.main_repo_name, "datagram");
        assert_eq!(config.request_delay_ms, 10);
    }

    #[tokio::test]
    async fn get_without_init_is_configuration_missing() {
        let h = create_test_harness();
        let result = ConfigService::new(h.ctx.clone()).get().await;
        assert!(matches!(result, Err(CoreError::ConfigurationMissing(_))));
    }
}
