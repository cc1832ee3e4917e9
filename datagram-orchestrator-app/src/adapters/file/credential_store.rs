//! `CredentialStore` implementation for `FileStore`.

use async_trait::async_trait;

use datagram_orchestrator_core::error::{CoreError, CoreResult};
use datagram_orchestrator_core::traits::CredentialStore;
use datagram_orchestrator_core::types::{Credential, CredentialKind};

use super::{read_optional, write_atomic, FileStore};

/// Parse a credential file: one secret per line, blank lines and `#` comments ignored.
///
/// Unlike import, a stored line that fails the kind's pattern means the file
/// was damaged or hand-edited, and the whole file is rejected.
fn parse_file(kind: CredentialKind, text: &str, origin: &str) -> CoreResult<Vec<Credential>> {
    let mut credentials = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !kind.accepts(line) {
            return Err(CoreError::StoreCorrupt(format!(
                "{origin}: line {} is not a valid {kind}",
                index + 1
            )));
        }
        credentials.push(Credential::new(kind, line));
    }
    Ok(credentials)
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn load(&self, kind: CredentialKind) -> CoreResult<Vec<Credential>> {
        let path = self.paths.credentials_file(kind);
        match read_optional(&path).await? {
            Some(text) => parse_file(kind, &text, &path.display().to_string()),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, kind: CredentialKind, credentials: &[Credential]) -> CoreResult<()> {
        let mut contents = String::new();
        for credential in credentials {
            contents.push_str(&credential.secret);
            contents.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        write_atomic(&self.paths.credentials_file(kind), contents).await?;
        log::debug!("Saved {} {kind} credential(s)", credentials.len());
        Ok(())
    }
}
