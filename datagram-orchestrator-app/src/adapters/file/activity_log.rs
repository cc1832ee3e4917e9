//! `ActivityLog` implementation for `FileStore`.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};

use async_trait::async_trait;
use chrono::Utc;

use datagram_orchestrator_core::error::{CoreError, CoreResult};
use datagram_orchestrator_core::traits::{ActivityLog, LogLines};
use datagram_orchestrator_core::utils::datetime::format_log_line;

use super::{run_blocking, FileStore};

#[async_trait]
impl ActivityLog for FileStore {
    async fn append(&self, message: &str) -> CoreResult<()> {
        let path = self.paths.log_file();
        let mut line = format_log_line(Utc::now(), message);
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        run_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            file.write_all(line.as_bytes())
        })
        .await
        .map_err(|e| CoreError::StorageError(format!("Failed to append activity log: {e}")))
    }

    async fn lines(&self) -> CoreResult<LogLines> {
        let path = self.paths.log_file();
        let file = match run_blocking(move || File::open(path)).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Box::new(std::iter::empty())),
            Err(e) => {
                return Err(CoreError::StorageError(format!(
                    "Failed to open activity log: {e}"
                )))
            }
        };

        // Lines are read on demand; an unreadable tail ends the stream.
        Ok(Box::new(BufReader::new(file).lines().map_while(Result::ok)))
    }
}
