//! Credential types

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::utils::fingerprint::fingerprint;
use crate::utils::mask_secret;

/// Recognized GitHub personal access token prefixes (classic, fine-grained).
pub const TOKEN_PREFIXES: &[&str] = &["ghp_", "github_pat_"];

/// API keys must be longer than this.
pub const API_KEY_MIN_EXCLUSIVE_LEN: usize = 10;

/// Number of masked API keys shown in [`ApiKeyStatus::preview`].
const API_KEY_PREVIEW_LEN: usize = 5;

/// What a stored secret grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    /// Key consumed by the deployed workflow, distributed as an Actions secret.
    ApiKey,
    /// GitHub personal access token acting for one account.
    GithubToken,
}

impl CredentialKind {
    pub const ALL: [Self; 2] = [Self::ApiKey, Self::GithubToken];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "api-key",
            Self::GithubToken => "github-token",
        }
    }

    /// Whether a trimmed, non-empty line is a well-formed secret of this kind.
    #[must_use]
    pub fn accepts(self, line: &str) -> bool {
        if line.chars().any(char::is_whitespace) {
            return false;
        }
        match self {
            Self::ApiKey => line.chars().count() > API_KEY_MIN_EXCLUSIVE_LEN,
            Self::GithubToken => TOKEN_PREFIXES
                .iter()
                .any(|prefix| line.len() > prefix.len() && line.starts_with(prefix)),
        }
    }
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CredentialKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown credential kind: {s}")))
    }
}

/// A stored secret.
///
/// `Debug` prints the masked form only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Fingerprint of the secret value.
    pub identifier: String,
    pub secret: String,
    pub kind: CredentialKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl Credential {
    pub fn new(kind: CredentialKind, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            identifier: fingerprint(&secret),
            secret,
            kind,
            scopes: None,
        }
    }

    #[must_use]
    pub fn masked(&self) -> String {
        mask_secret(&self.secret)
    }

    #[must_use]
    pub fn to_masked(&self) -> MaskedCredential {
        MaskedCredential {
            identifier: self.identifier.clone(),
            kind: self.kind,
            masked: self.masked(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("kind", &self.kind)
            .field("secret", &self.masked())
            .finish()
    }
}

/// Display-safe view of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedCredential {
    pub identifier: String,
    pub kind: CredentialKind,
    pub masked: String,
}

/// Summary of stored API keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeyStatus {
    pub count: usize,
    /// Masked view of the first few keys.
    pub preview: Vec<String>,
}

impl ApiKeyStatus {
    #[must_use]
    pub fn from_credentials(keys: &[Credential]) -> Self {
        Self {
            count: keys.len(),
            preview: keys
                .iter()
                .take(API_KEY_PREVIEW_LEN)
                .map(Credential::masked)
                .collect(),
        }
    }
}

/// Result of parsing credential source text.
#[derive(Debug, Clone, Default)]
pub struct ParsedCredentials {
    /// Pattern-valid lines, in source order. May contain duplicates.
    pub accepted: Vec<Credential>,
    /// 1-based line numbers of non-blank lines that failed the pattern.
    pub rejected_lines: Vec<usize>,
}

impl ParsedCredentials {
    /// Parses one secret per line. Blank lines and `#` comments are ignored.
    #[must_use]
    pub fn parse(kind: CredentialKind, source: &str) -> Self {
        let mut parsed = Self::default();
        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if kind.accepts(line) {
                parsed.accepted.push(Credential::new(kind, line));
            } else {
                parsed.rejected_lines.push(index + 1);
            }
        }
        parsed
    }
}
