//! Credential import and display

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::{ApiKeyStatus, CredentialKind, MaskedCredential, ParsedCredentials};

/// Credential service
pub struct CredentialService {
    ctx: Arc<ServiceContext>,
}

impl CredentialService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Import credentials from text, one per line
    ///
    /// New values are merged into the store, deduplicated by value.
    ///
    /// # Returns
    /// Number of non-blank, pattern-valid lines in `source`
    pub async fn import(&self, kind: CredentialKind, source: &str) -> CoreResult<usize> {
        let parsed = ParsedCredentials::parse(kind, source);
        if !parsed.rejected_lines.is_empty() {
            log::warn!(
                "Ignored {} malformed {kind} line(s): {:?}",
                parsed.rejected_lines.len(),
                parsed.rejected_lines
            );
        }
        if parsed.accepted.is_empty() {
            return Err(CoreError::NoValidCredentials(format!(
                "no valid {kind} found in input"
            )));
        }

        let count = parsed.accepted.len();
        let mut stored = self.ctx.credential_store().load(kind).await?;
        let mut seen: HashSet<String> = stored.iter().map(|c| c.secret.clone()).collect();
        let mut added = 0;
        for credential in parsed.accepted {
            if seen.insert(credential.secret.clone()) {
                stored.push(credential);
                added += 1;
            }
        }
        self.ctx.credential_store().save(kind, &stored).await?;

        log::info!("Imported {count} {kind} value(s), {added} new, {} stored", stored.len());
        self.ctx
            .record_activity(&format!(
                "Imported {count} {kind} value(s): {added} new, {} stored",
                stored.len()
            ))
            .await;
        Ok(count)
    }

    /// Display-safe view of stored credentials
    pub async fn masked(&self, kind: CredentialKind) -> CoreResult<Vec<MaskedCredential>> {
        let stored = self.ctx.credential_store().load(kind).await?;
        Ok(stored.iter().map(|c| c.to_masked()).collect())
    }

    pub async fn api_key_status(&self) -> CoreResult<ApiKeyStatus> {
        let keys = self
            .ctx
            .credential_store()
            .load(CredentialKind::ApiKey)
            .await?;
        Ok(ApiKeyStatus::from_credentials(&keys))
    }
}
