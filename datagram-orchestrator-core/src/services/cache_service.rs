//! Cache maintenance

use std::sync::Arc;

use crate::error::CoreResult;
use crate::services::ServiceContext;
use crate::types::{
    CacheScope, CacheSummary, CompletionIndex, OperationCacheSummary, OperationKind, Outcome,
};

/// Cache service
pub struct CacheService {
    ctx: Arc<ServiceContext>,
}

impl CacheService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Remove cache files
    ///
    /// Destructive and irreversible. Nothing is touched unless `confirmed` is set.
    ///
    /// # Returns
    /// Number of cache files removed
    pub async fn clean(&self, confirmed: bool, scope: CacheScope) -> CoreResult<usize> {
        if !confirmed {
            log::info!("Cache clean not confirmed, nothing removed");
            return Ok(0);
        }

        let mut removed = 0;
        if scope.includes_tokens() {
            removed += self.ctx.account_repository().clear().await?;
        }
        removed += match scope {
            CacheScope::All => self.ctx.operation_cache().clear(None).await?,
            CacheScope::Operation(kind) => self.ctx.operation_cache().clear(Some(kind)).await?,
            CacheScope::Tokens => 0,
        };

        log::info!("Cache cleaned ({scope:?}): {removed} file(s) removed");
        self.ctx
            .record_activity(&format!("Cache cleaned ({scope:?}): {removed} file(s) removed"))
            .await;
        Ok(removed)
    }

    /// Record counts per operation kind
    pub async fn summary(&self) -> CoreResult<CacheSummary> {
        let accounts = self.ctx.account_repository().find_all().await?.len();
        let mut operations = Vec::new();
        for kind in OperationKind::ALL {
            let records = self.ctx.operation_cache().records(kind).await?;
            if records.is_empty() {
                continue;
            }
            let index = CompletionIndex::from_records(&records);
            let count = |outcome: Outcome| records.iter().filter(|r| r.outcome == outcome).count();
            operations.push(OperationCacheSummary {
                operation: kind,
                records: records.len(),
                completed: index.completed_accounts(kind).count(),
                failed: count(Outcome::Failed),
                skipped: count(Outcome::Skipped),
            });
        }
        Ok(CacheSummary {
            accounts,
            operations,
        })
    }
}
