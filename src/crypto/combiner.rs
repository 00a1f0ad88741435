//! Merge the classical and post-quantum secrets into one 32-byte key.
//!
//! Each input is brought to 32 bytes (kept as is when already 32 bytes,
//! SHA-256 otherwise). The two are XORed and the XOR is run through
//! HMAC-SHA256 keyed with the `quantum-vault-hybrid-v1` label. Envelopes
//! tagged `hybrid-v1` depend on this exact construction.

use hmac::digest::Key;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const COMBINED_SECRET_BYTES: usize = 32;

/// HMAC key for the final mixing step
const LABEL: &[u8] = b"quantum-vault-hybrid-v1";

type HmacSha256 = Hmac<Sha256>;

/// Symmetric key produced by `combine`. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CombinedSecret([u8; COMBINED_SECRET_BYTES]);

impl CombinedSecret {
    pub fn as_bytes(&self) -> &[u8; COMBINED_SECRET_BYTES] {
        &self.0
    }
}

fn normalize(input: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    if input.len() == 32 {
        out.copy_from_slice(input);
    } else {
        out.copy_from_slice(&Sha256::digest(input));
    }
    out
}

/// Combine the ECDH secret `classical` with the KEM secret `post_quantum`.
pub fn combine(classical: &[u8], post_quantum: &[u8]) -> CombinedSecret {
    let mut a = normalize(classical);
    let mut b = normalize(post_quantum);

    let mut mixed = [0u8; 32];
    for (m, (x, y)) in mixed.iter_mut().zip(a.iter().zip(b.iter())) {
        *m = x ^ y;
    }
    a.zeroize();
    b.zeroize();

    // HMAC zero-pads short keys to the block size, so this equals keying
    // with LABEL directly.
    let mut key = Key::<HmacSha256>::default();
    key[..LABEL.len()].copy_from_slice(LABEL);
    let mut mac = <HmacSha256 as Mac>::new(&key);
    mac.update(&mixed);
    mixed.zeroize();

    let mut out = [0u8; COMBINED_SECRET_BYTES];
    out.copy_from_slice(&mac.finalize().into_bytes());
    CombinedSecret(out)
}
