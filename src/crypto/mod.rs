pub mod aead;
pub mod combiner;
pub mod kem;
pub mod key_exchange;
pub mod signing;

pub use aead::Sealed;
pub use combiner::{combine, CombinedSecret};
pub use kem::Encapsulation;

use crate::error::{Error, Result};
use base64::Engine;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Algorithms a `KeyPair` can belong to, with their fixed encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// ECDH over NIST P-256. Public key is SEC1 uncompressed, private key is
    /// the raw scalar.
    EcdhP256,
    /// ML-KEM-768 (FIPS 203)
    MlKem768,
    /// ML-DSA-65 (FIPS 204)
    MlDsa65,
}

impl Algorithm {
    pub const fn public_key_len(self) -> usize {
        match self {
            Algorithm::EcdhP256 => key_exchange::PUBLIC_KEY_BYTES,
            Algorithm::MlKem768 => kem::PUBLIC_KEY_BYTES,
            Algorithm::MlDsa65 => signing::PUBLIC_KEY_BYTES,
        }
    }

    pub const fn private_key_len(self) -> usize {
        match self {
            Algorithm::EcdhP256 => key_exchange::PRIVATE_KEY_BYTES,
            Algorithm::MlKem768 => kem::PRIVATE_KEY_BYTES,
            Algorithm::MlDsa65 => signing::PRIVATE_KEY_BYTES,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::EcdhP256 => "ECDH-P256",
            Algorithm::MlKem768 => "ML-KEM-768",
            Algorithm::MlDsa65 => "ML-DSA-65",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Public/private key bytes for one algorithm. The private half is wiped
/// when the pair is dropped and never printed.
#[derive(Clone)]
pub struct KeyPair {
    algorithm: Algorithm,
    public: Vec<u8>,
    private: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    /// Wrap raw key bytes, checking both lengths against `algorithm`.
    pub fn new(algorithm: Algorithm, public: Vec<u8>, private: Vec<u8>) -> Result<Self> {
        let private = Zeroizing::new(private);
        check_len(algorithm.public_key_len(), public.len())?;
        check_len(algorithm.private_key_len(), private.len())?;
        Ok(Self {
            algorithm,
            public,
            private,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .field("public", &format_args!("{} bytes", self.public.len()))
            .field("private", &"<redacted>")
            .finish()
    }
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::InvalidKeySize { expected, actual });
    }
    Ok(())
}

/// Constant-time equality for byte strings; unequal lengths compare false.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

pub(crate) fn encode_b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub(crate) fn decode_b64(encoded: &str) -> Option<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()
}
