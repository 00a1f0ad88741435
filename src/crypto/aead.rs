use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use crate::entropy::EntropySource;
use crate::error::{Error, Result};

pub const KEY_BYTES: usize = 32;
pub const NONCE_BYTES: usize = 12;
pub const TAG_BYTES: usize = 16;

/// AES-GCM refuses plaintexts longer than 2^36 - 32 bytes.
const MAX_PLAINTEXT_BYTES: u64 = (1 << 36) - 32;

/// Sealing only fails when the plaintext exceeds `MAX_PLAINTEXT_BYTES`.
fn plaintext_too_long(requested: usize) -> Error {
    Error::InvalidLength {
        requested,
        max: usize::try_from(MAX_PLAINTEXT_BYTES).unwrap_or(usize::MAX),
    }
}

/// AES-256-GCM output. `ciphertext` ends with the 16-byte tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_BYTES],
}

/// Encrypt `plaintext` under `key` with AES-256-GCM
///
/// # Arguments
/// * `plaintext` - The message to encrypt
/// * `key` - 32-byte key (the combined hybrid secret)
/// * `entropy` - source of the 12-byte nonce; a fresh one is drawn per call
pub async fn encrypt(plaintext: &[u8], key: &[u8; KEY_BYTES], entropy: &EntropySource) -> Result<Sealed> {
    let nonce = entropy.request_array::<NONCE_BYTES>().await?;
    let cipher = Aes256Gcm::new(key.into());

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| plaintext_too_long(plaintext.len()))?;

    Ok(Sealed { ciphertext, nonce })
}

/// Decrypt and authenticate. Every failure, a malformed nonce included, is
/// reported as `Error::AuthenticationFailure`.
pub fn decrypt(ciphertext: &[u8], nonce: &[u8], key: &[u8; KEY_BYTES]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_BYTES || ciphertext.len() < TAG_BYTES {
        return Err(Error::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new(key.into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::AuthenticationFailure)
}
