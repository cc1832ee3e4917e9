//! File-based unified store.
//!
//! A single `FileStore` implements every core storage trait against plain files
//! under one [`StoragePaths`] root: line-per-secret credential files, JSON caches,
//! and an append-only activity log.

mod account_repo;
mod activity_log;
mod config_repo;
mod credential_store;
mod operation_cache;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use datagram_orchestrator_core::error::{CoreError, CoreResult};
use datagram_orchestrator_core::types::{CompletionIndex, OperationKind, OperationRecord};

use crate::paths::StoragePaths;

/// Loaded records of one operation kind plus their completion index.
#[derive(Debug, Default)]
pub(crate) struct OperationLog {
    pub(crate) records: Vec<OperationRecord>,
    pub(crate) index: CompletionIndex,
}

impl OperationLog {
    fn new(records: Vec<OperationRecord>) -> Self {
        let index = CompletionIndex::from_records(&records);
        Self { records, index }
    }
}

/// File-based store for the CLI.
///
/// Implements `CredentialStore`, `AccountRepository`, `OperationCache`,
/// `ActivityLog` and `ConfigRepository`.
///
/// All writes are serialized through one async mutex and replace files
/// atomically (temp file + rename), so a crash never leaves half a file behind.
/// Operation records are indexed in memory after the first read of each kind.
pub struct FileStore {
    pub(crate) paths: StoragePaths,
    pub(crate) operations: RwLock<HashMap<OperationKind, OperationLog>>,
    pub(crate) write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            operations: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }
}

/// Read a whole file. `Ok(None)` when it does not exist.
pub(crate) async fn read_optional(path: &Path) -> CoreResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == ErrorKind::InvalidData => Err(CoreError::StoreCorrupt(format!(
            "{}: {e}",
            path.display()
        ))),
        Err(e) => Err(CoreError::StorageError(format!(
            "Failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// Read and decode a JSON file. `Ok(None)` when it does not exist.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> CoreResult<Option<T>> {
    let Some(text) = read_optional(path).await? else {
        return Ok(None);
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| CoreError::StoreCorrupt(format!("{}: {e}", path.display())))
}

/// Encode as pretty JSON and replace `path` atomically.
pub(crate) async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> CoreResult<()> {
    let mut contents = serde_json::to_string_pretty(value)?;
    contents.push('\n');
    write_atomic(path, contents).await
}

/// Write to a sibling temp file, then rename over `path`.
pub(crate) async fn write_atomic(path: &Path, contents: String) -> CoreResult<()> {
    let path = path.to_path_buf();
    run_blocking(move || {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(&path);
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &path)
    })
    .await
    .map_err(|e| CoreError::StorageError(format!("Failed to write file: {e}")))
}

/// Delete a file. `Ok(false)` when it was already gone.
pub(crate) async fn remove_if_exists(path: &Path) -> CoreResult<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CoreError::StorageError(format!(
            "Failed to remove {}: {e}",
            path.display()
        ))),
    }
}

/// Run blocking file I/O off the async worker threads.
pub(crate) async fn run_blocking<T, F>(f: F) -> std::io::Result<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(std::io::Error::other)?
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
