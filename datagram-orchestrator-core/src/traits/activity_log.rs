//! Activity log abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;

/// Lazily read log lines, oldest first.
pub type LogLines = Box<dyn Iterator<Item = String> + Send>;

/// Human-readable activity log Trait
///
/// Platform implementation:
/// - File system: `FileStore` (`logs/orchestrator.log`)
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Append one timestamped line
    async fn append(&self, message: &str) -> CoreResult<()>;

    /// Stream all lines. An absent log yields an empty iterator.
    async fn lines(&self) -> CoreResult<LogLines>;
}
