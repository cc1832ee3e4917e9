//! Credential storage abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{Credential, CredentialKind};

/// Credential Store Trait
///
/// Holds the ordered list of stored secrets per [`CredentialKind`].
///
/// Platform implementation:
/// - File system: `FileStore` (`config/api_keys.txt`, `config/tokens.txt`)
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load all credentials of a kind, in stored order
    ///
    /// # Returns
    /// * `Ok(vec![])` - nothing stored yet
    /// * `Err(StoreCorrupt)` - backing data exists but is unreadable
    async fn load(&self, kind: CredentialKind) -> CoreResult<Vec<Credential>>;

    /// Replace all credentials of a kind
    ///
    /// # Arguments
    /// * `kind` - Credential kind
    /// * `credentials` - Full, already deduplicated list
    async fn save(&self, kind: CredentialKind, credentials: &[Credential]) -> CoreResult<()>;
}
