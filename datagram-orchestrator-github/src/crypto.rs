//! Actions secret encryption
//!
//! GitHub expects secret values sealed with the repository's X25519 public key using a
//! libsodium `crypto_box_seal` compatible construction, then base64-encoded.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crypto_box::aead::OsRng;
use crypto_box::{KEY_SIZE, PublicKey};

use crate::error::{GithubError, Result};

/// Seals `plaintext` for the repository whose base64 public key is `public_key_b64`.
///
/// Returns the base64 ciphertext expected by `PUT .../actions/secrets/{name}`.
pub fn seal_secret(public_key_b64: &str, plaintext: &str) -> Result<String> {
    let key_bytes = STANDARD
        .decode(public_key_b64.trim())
        .map_err(|e| GithubError::EncryptionError {
            detail: format!("invalid public key encoding: {e}"),
        })?;

    let key: [u8; KEY_SIZE] =
        key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| GithubError::EncryptionError {
                detail: format!(
                    "public key must be {KEY_SIZE} bytes, got {}",
                    key_bytes.len()
                ),
            })?;

    let sealed = PublicKey::from(key)
        .seal(&mut OsRng, plaintext.as_bytes())
        .map_err(|e| GithubError::EncryptionError {
            detail: e.to_string(),
        })?;

    Ok(STANDARD.encode(sealed))
}
