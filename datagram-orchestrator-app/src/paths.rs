//! On-disk layout of a data root.

use std::path::{Path, PathBuf};

use datagram_orchestrator_core::types::{CredentialKind, OperationKind};

/// Environment variable selecting the data root when no explicit root is given.
pub const DATA_ROOT_ENV: &str = "DATAGRAM_HOME";

/// Directory name used under the platform data directory.
pub const DATA_DIR_NAME: &str = "datagram-orchestrator";

/// Every file path the file store touches, derived from one root directory.
///
/// ```text
/// <root>/config/api_keys.txt
/// <root>/config/tokens.txt
/// <root>/config/config.json
/// <root>/config/.cache/token_cache.json
/// <root>/config/.cache/<operation>.json
/// <root>/logs/orchestrator.log
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.config_dir().join(".cache")
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    #[must_use]
    pub fn credentials_file(&self, kind: CredentialKind) -> PathBuf {
        let name = match kind {
            CredentialKind::ApiKey => "api_keys.txt",
            CredentialKind::GithubToken => "tokens.txt",
        };
        self.config_dir().join(name)
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.json")
    }

    #[must_use]
    pub fn token_cache_file(&self) -> PathBuf {
        self.cache_dir().join("token_cache.json")
    }

    #[must_use]
    pub fn operation_cache_file(&self, kind: OperationKind) -> PathBuf {
        self.cache_dir().join(format!("{}.json", kind.as_str()))
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("orchestrator.log")
    }
}
