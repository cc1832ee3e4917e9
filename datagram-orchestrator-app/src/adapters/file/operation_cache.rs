//! `OperationCache` implementation for `FileStore`.
//!
//! One JSON array of records per operation kind. Each kind is read once and then
//! served from memory; every append rewrites that kind's file atomically.

use async_trait::async_trait;

use datagram_orchestrator_core::error::CoreResult;
use datagram_orchestrator_core::traits::OperationCache;
use datagram_orchestrator_core::types::{OperationKind, OperationRecord};

use super::{read_json, remove_if_exists, write_json, FileStore, OperationLog};

impl FileStore {
    /// Make sure `kind` is present in the in-memory index.
    async fn ensure_operation_loaded(&self, kind: OperationKind) -> CoreResult<()> {
        if self.operations.read().await.contains_key(&kind) {
            return Ok(());
        }
        // Loading under the write lock keeps a concurrent clear from being undone
        let _guard = self.write_lock.lock().await;
        self.load_operation_locked(kind).await
    }

    /// Read `kind` from disk unless already indexed. Caller holds `write_lock`.
    async fn load_operation_locked(&self, kind: OperationKind) -> CoreResult<()> {
        if self.operations.read().await.contains_key(&kind) {
            return Ok(());
        }

        let records: Vec<OperationRecord> = read_json(&self.paths.operation_cache_file(kind))
            .await?
            .unwrap_or_default();
        log::debug!("Loaded {} {kind} record(s) from disk", records.len());

        self.operations
            .write()
            .await
            .insert(kind, OperationLog::new(records));
        Ok(())
    }
}

#[async_trait]
impl OperationCache for FileStore {
    async fn has_completed(&self, account: &str, operation: OperationKind) -> CoreResult<bool> {
        self.ensure_operation_loaded(operation).await?;
        Ok(self
            .operations
            .read()
            .await
            .get(&operation)
            .is_some_and(|cached| cached.index.is_completed(account, operation)))
    }

    async fn record_outcome(&self, record: &OperationRecord) -> CoreResult<()> {
        let kind = record.operation;
        let _guard = self.write_lock.lock().await;
        self.load_operation_locked(kind).await?;

        let mut records = self
            .operations
            .read()
            .await
            .get(&kind)
            .map(|cached| cached.records.clone())
            .unwrap_or_default();
        records.push(record.clone());

        // Memory is only updated once the file is durable.
        write_json(&self.paths.operation_cache_file(kind), &records).await?;

        let mut operations = self.operations.write().await;
        let cached = operations.entry(kind).or_default();
        cached.index.apply(record);
        cached.records = records;
        Ok(())
    }

    async fn records(&self, operation: OperationKind) -> CoreResult<Vec<OperationRecord>> {
        self.ensure_operation_loaded(operation).await?;
        Ok(self
            .operations
            .read()
            .await
            .get(&operation)
            .map(|cached| cached.records.clone())
            .unwrap_or_default())
    }

    async fn clear(&self, operation: Option<OperationKind>) -> CoreResult<usize> {
        let kinds = match operation {
            Some(kind) => vec![kind],
            None => OperationKind::ALL.to_vec(),
        };

        let _guard = self.write_lock.lock().await;
        let mut removed = 0;
        for kind in kinds {
            if remove_if_exists(&self.paths.operation_cache_file(kind)).await? {
                removed += 1;
            }
            self.operations.write().await.remove(&kind);
        }
        Ok(removed)
    }
}
