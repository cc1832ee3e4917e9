//! Response envelope for front ends

use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// Tagged result wrapper rendered by front ends (`{"status": "success", "data": ...}`).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandResult<T> {
    Success { data: T },
    Error { error: CoreError },
}

impl<T> CommandResult<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl<T> From<CoreResult<T>> for CommandResult<T> {
    fn from(result: CoreResult<T>) -> Self {
        match result {
            Ok(data) => Self::Success { data },
            Err(error) => Self::Error { error },
        }
    }
}
