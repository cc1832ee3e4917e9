//! Operation cache abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{OperationKind, OperationRecord};

/// Operation Cache Trait
///
/// Append-only record of per-account outcomes, used to skip completed work on rerun.
/// Completion follows [`CompletionIndex`](crate::types::CompletionIndex) semantics.
///
/// Implementations must tolerate concurrent `record_outcome` calls: every record
/// is kept and the backing store never ends up half written.
///
/// Platform implementation:
/// - File system: `FileStore` (`config/.cache/<operation>.json`)
#[async_trait]
pub trait OperationCache: Send + Sync {
    /// Whether `account` has authoritatively completed `operation`
    async fn has_completed(&self, account: &str, operation: OperationKind) -> CoreResult<bool>;

    /// Durably append one record
    async fn record_outcome(&self, record: &OperationRecord) -> CoreResult<()>;

    /// Records of one operation, in write order
    async fn records(&self, operation: OperationKind) -> CoreResult<Vec<OperationRecord>>;

    /// Remove stored records
    ///
    /// # Arguments
    /// * `operation` - Single operation to clear, or `None` for all
    ///
    /// # Returns
    /// Number of backing files removed
    async fn clear(&self, operation: Option<OperationKind>) -> CoreResult<usize>;
}
