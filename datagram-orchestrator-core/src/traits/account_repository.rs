//! Validated account persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::Account;

/// Token cache Trait
///
/// Maps validated tokens to the account they belong to.
///
/// Platform implementation:
/// - File system: `FileStore` (`config/.cache/token_cache.json`)
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Get all validated accounts, in insertion order
    async fn find_all(&self) -> CoreResult<Vec<Account>>;

    /// Look up the account a token was validated for
    ///
    /// # Arguments
    /// * `token` - Raw token value
    async fn find_by_token(&self, token: &str) -> CoreResult<Option<Account>>;

    /// Save account (new or update, keyed by token)
    ///
    /// # Arguments
    /// * `account` - Account data
    async fn save(&self, account: &Account) -> CoreResult<()>;

    /// Forget the account validated for a token
    async fn remove_by_token(&self, token: &str) -> CoreResult<()>;

    /// Remove every cached account
    ///
    /// # Returns
    /// Number of backing files removed
    async fn clear(&self) -> CoreResult<usize>;
}
