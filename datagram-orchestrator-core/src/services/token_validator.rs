//! Token validation
//!
//! Every stored token is checked independently with `GET /user`. Successful checks
//! populate the account directory used by batch runs.

use std::sync::Arc;

use crate::error::{CoreError, CoreResult, FailureClass};
use crate::services::ServiceContext;
use crate::types::{Account, Credential, CredentialKind, TokenStatus, TokenValidation};

/// Token validator
pub struct TokenValidator {
    ctx: Arc<ServiceContext>,
}

impl TokenValidator {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Validate all stored GitHub tokens, in stored order
    ///
    /// # Arguments
    /// * `revalidate` - Check tokens already in the account directory again
    pub async fn validate_all(&self, revalidate: bool) -> CoreResult<Vec<TokenValidation>> {
        let tokens = self
            .ctx
            .credential_store()
            .load(CredentialKind::GithubToken)
            .await?;
        if tokens.is_empty() {
            return Err(CoreError::NoValidCredentials(
                "no GitHub tokens imported".to_string(),
            ));
        }

        let mut results = Vec::with_capacity(tokens.len());
        for token in &tokens {
            results.push(self.validate_one(token, revalidate).await?);
        }

        let valid = results.iter().filter(|r| r.status.is_valid()).count();
        log::info!("Validated {} token(s): {valid} valid", results.len());
        self.ctx
            .record_activity(&format!(
                "Validated {} token(s): {valid} valid, {} not valid",
                results.len(),
                results.len() - valid
            ))
            .await;
        Ok(results)
    }

    async fn validate_one(
        &self,
        credential: &Credential,
        revalidate: bool,
    ) -> CoreResult<TokenValidation> {
        let accounts = self.ctx.account_repository();
        let masked = credential.masked();

        if !revalidate {
            if let Some(account) = accounts.find_by_token(&credential.secret).await? {
                log::debug!("Token {masked} answered from cache ({})", account.username);
                return Ok(TokenValidation {
                    identifier: credential.identifier.clone(),
                    masked,
                    status: TokenStatus::Valid,
                    username: Some(account.username),
                    scopes: account.scopes,
                    cached: true,
                    detail: None,
                });
            }
        }

        let client = self.ctx.client_for(&credential.secret).await?;
        match client.authenticated_user().await {
            Ok(user) => {
                let account = Account::new(&user.login, &credential.secret)
                    .with_scopes(user.scopes.clone());
                accounts.save(&account).await?;
                self.ctx
                    .record_activity(&format!("Token {masked} valid for {}", user.login))
                    .await;
                Ok(TokenValidation {
                    identifier: credential.identifier.clone(),
                    masked,
                    status: TokenStatus::Valid,
                    username: Some(user.login),
                    scopes: user.scopes,
                    cached: false,
                    detail: None,
                })
            }
            Err(e) => {
                let status = TokenStatus::from_error(&e);
                if e.class() == FailureClass::Auth {
                    accounts.remove_by_token(&credential.secret).await?;
                }
                if e.is_expected() {
                    log::warn!("Token {masked} is {status}: {e}");
                } else {
                    log::error!("Token {masked} could not be checked: {e}");
                }
                self.ctx
                    .record_activity(&format!("Token {masked} {status}: {e}"))
                    .await;
                Ok(TokenValidation {
                    identifier: credential.identifier.clone(),
                    masked,
                    status,
                    username: None,
                    scopes: None,
                    cached: false,
                    detail: Some(e.to_string()),
                })
            }
        }
    }
}
