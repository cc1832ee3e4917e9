//! Configuration persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::OrchestratorConfig;

/// Configuration Trait
///
/// Platform implementation:
/// - File system: `FileStore` (`config/config.json`)
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Load configuration. `Ok(None)` when never initialized.
    async fn load(&self) -> CoreResult<Option<OrchestratorConfig>>;

    async fn save(&self, config: &OrchestratorConfig) -> CoreResult<()>;
}
