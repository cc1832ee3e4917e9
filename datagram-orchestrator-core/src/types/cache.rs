//! Cache maintenance types

use serde::{Deserialize, Serialize};

use super::OperationKind;
use crate::error::{CoreError, CoreResult};

/// Which cache files a clean removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheScope {
    /// Token cache and every operation cache
    #[default]
    All,
    /// Token cache only
    Tokens,
    Operation(OperationKind),
}

impl CacheScope {
    #[must_use]
    pub fn includes_tokens(self) -> bool {
        matches!(self, Self::All | Self::Tokens)
    }
}

impl std::str::FromStr for CacheScope {
    type Err = CoreError;

    /// `all`, `tokens`, or an operation name such as `invite`.
    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "all" => Ok(Self::All),
            "tokens" => Ok(Self::Tokens),
            other => other
                .parse::<OperationKind>()
                .map(Self::Operation)
                .map_err(|_| CoreError::ValidationError(format!("unknown cache scope: {other}"))),
        }
    }
}

/// Per-operation cache counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCacheSummary {
    pub operation: OperationKind,
    pub records: usize,
    /// Accounts currently considered complete
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSummary {
    /// Validated accounts in the token cache
    pub accounts: usize,
    pub operations: Vec<OperationCacheSummary>,
}
