//! `ConfigRepository` implementation for `FileStore`.

use async_trait::async_trait;

use datagram_orchestrator_core::error::CoreResult;
use datagram_orchestrator_core::traits::ConfigRepository;
use datagram_orchestrator_core::types::OrchestratorConfig;

use super::{read_json, write_json, FileStore};

#[async_trait]
impl ConfigRepository for FileStore {
    async fn load(&self) -> CoreResult<Option<OrchestratorConfig>> {
        read_json(&self.paths.config_file()).await
    }

    async fn save(&self, config: &OrchestratorConfig) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.paths.config_file(), config).await
    }
}
