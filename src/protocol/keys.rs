/// Hybrid key bundles: one P-256 pair plus one ML-KEM-768 pair
///
/// Exported form (JSON):
/// `{"ecc": {"publicKey", "privateKey"}, "kyber": {"publicKey", "privateKey"}, "version"}`
/// with the ECDH halves as base64 SPKI / PKCS#8 DER and the KEM halves as
/// base64 raw bytes.
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::config::PROTOCOL_VERSION;
use crate::crypto::{ct_eq, kem, key_exchange, Algorithm, KeyPair};
use crate::entropy::EntropySource;
use crate::error::{Error, Result};

/// A user's long-term encryption identity.
#[derive(Debug, Clone)]
pub struct HybridKeyPair {
    pub ec: KeyPair,
    pub kem: KeyPair,
    pub version: String,
}

/// Public half of a `HybridKeyPair`, as published to peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridPublicKeys {
    /// SEC1 uncompressed P-256 point
    pub ec: Vec<u8>,
    /// ML-KEM-768 encapsulation key
    pub kem: Vec<u8>,
}

impl HybridKeyPair {
    /// Pair up existing keys; each half must belong to the right algorithm.
    pub fn new(ec: KeyPair, kem: KeyPair) -> Result<Self> {
        if ec.algorithm() != Algorithm::EcdhP256 || kem.algorithm() != Algorithm::MlKem768 {
            return Err(Error::InvalidKeyMaterial);
        }
        Ok(Self {
            ec,
            kem,
            version: PROTOCOL_VERSION.to_string(),
        })
    }

    pub async fn generate(entropy: &EntropySource) -> Result<Self> {
        let ec = key_exchange::generate_keypair(entropy).await?;
        let kem = kem::generate_keypair(entropy).await?;
        Self::new(ec, kem)
    }

    /// Deterministic bundle from a 32-byte seed
    pub fn generate_from_seed(seed: &[u8; 32]) -> Result<Self> {
        let mut rng = ChaCha20Rng::from_seed(*seed);
        let mut ec_seed = Zeroizing::new([0u8; 32]);
        let mut kem_seed = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(&mut *ec_seed);
        rng.fill_bytes(&mut *kem_seed);

        Self::new(
            key_exchange::generate_keypair_from_seed(&ec_seed)?,
            kem::generate_keypair_from_seed(&kem_seed)?,
        )
    }

    pub fn public_keys(&self) -> HybridPublicKeys {
        HybridPublicKeys {
            ec: self.ec.public_key().to_vec(),
            kem: self.kem.public_key().to_vec(),
        }
    }

    pub fn export(&self) -> Result<ExportedKeyPair> {
        let ec_private = key_exchange::export_private_key(self.ec.private_key())?;
        let kem_private = kem::export_private_key(self.kem.private_key());
        Ok(ExportedKeyPair {
            ecc: ExportedKeyHalf {
                public_key: key_exchange::export_public_key(self.ec.public_key())?,
                private_key: ec_private.to_string(),
            },
            kyber: ExportedKeyHalf {
                public_key: kem::export_public_key(self.kem.public_key()),
                private_key: kem_private.to_string(),
            },
            version: self.version.clone(),
        })
    }

    /// Rebuild a bundle from its exported form. Only `hybrid-v1` bundles
    /// are accepted.
    pub fn import(exported: &ExportedKeyPair) -> Result<Self> {
        if exported.version != PROTOCOL_VERSION {
            return Err(Error::UnsupportedVersion(exported.version.clone()));
        }

        let ec_public = key_exchange::import_public_key(&exported.ecc.public_key)?;
        let ec_private = key_exchange::import_private_key(&exported.ecc.private_key)?;
        if !ct_eq(&key_exchange::derive_public_key(&ec_private)?, &ec_public) {
            return Err(Error::InvalidKeyMaterial);
        }

        let kem_public = kem::import_public_key(&exported.kyber.public_key)?;
        let kem_private = kem::import_private_key(&exported.kyber.private_key)?;

        Self::new(
            KeyPair::new(Algorithm::EcdhP256, ec_public, ec_private.to_vec())?,
            KeyPair::new(Algorithm::MlKem768, kem_public, kem_private.to_vec())?,
        )
    }
}

impl HybridPublicKeys {
    /// Check sizes and that the EC point is on the curve.
    pub fn new(ec: Vec<u8>, kem: Vec<u8>) -> Result<Self> {
        if ec.len() != key_exchange::PUBLIC_KEY_BYTES {
            return Err(Error::InvalidKeyMaterial);
        }
        // Round-tripping through the encoder validates the point.
        key_exchange::export_public_key(&ec)?;
        if kem.len() != kem::PUBLIC_KEY_BYTES {
            return Err(Error::InvalidKeySize {
                expected: kem::PUBLIC_KEY_BYTES,
                actual: kem.len(),
            });
        }
        Ok(Self { ec, kem })
    }

    pub fn export(&self) -> Result<ExportedPublicKeys> {
        Ok(ExportedPublicKeys {
            ecc: key_exchange::export_public_key(&self.ec)?,
            kyber: kem::export_public_key(&self.kem),
            version: PROTOCOL_VERSION.to_string(),
        })
    }

    pub fn import(exported: &ExportedPublicKeys) -> Result<Self> {
        if exported.version != PROTOCOL_VERSION {
            return Err(Error::UnsupportedVersion(exported.version.clone()));
        }
        Self::new(
            key_exchange::import_public_key(&exported.ecc)?,
            kem::import_public_key(&exported.kyber)?,
        )
    }
}

/// Encoded public/private halves for one algorithm.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ExportedKeyHalf {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for ExportedKeyHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedKeyHalf")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Serializable form of a `HybridKeyPair`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedKeyPair {
    pub ecc: ExportedKeyHalf,
    pub kyber: ExportedKeyHalf,
    pub version: String,
}

impl ExportedKeyPair {
    pub fn to_json(&self) -> Result<Zeroizing<String>> {
        serde_json::to_string(self)
            .map(Zeroizing::new)
            .map_err(|_| Error::InvalidKeyMaterial)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|_| Error::InvalidKeyMaterial)
    }
}

/// Serializable form of `HybridPublicKeys`, safe to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedPublicKeys {
    pub ecc: String,
    pub kyber: String,
    pub version: String,
}

impl ExportedPublicKeys {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|_| Error::InvalidKeyMaterial)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|_| Error::InvalidKeyMaterial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_bundle_is_deterministic() {
        let a = HybridKeyPair::generate_from_seed(&[1u8; 32]).unwrap();
        let b = HybridKeyPair::generate_from_seed(&[1u8; 32]).unwrap();
        assert_eq!(a.public_keys(), b.public_keys());
        assert_eq!(a.version, "hybrid-v1");
    }

    #[test]
    fn test_new_rejects_swapped_halves() {
        let kp = HybridKeyPair::generate_from_seed(&[2u8; 32]).unwrap();
        assert_eq!(
            HybridKeyPair::new(kp.kem.clone(), kp.ec.clone()).unwrap_err(),
            Error::InvalidKeyMaterial
        );
    }

    #[test]
    fn test_export_import_key_pair() {
        let kp = HybridKeyPair::generate_from_seed(&[3u8; 32]).unwrap();
        let json = kp.export().unwrap().to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["ecc"]["publicKey"].is_string());
        assert!(value["kyber"]["privateKey"].is_string());
        assert_eq!(value["version"], "hybrid-v1");

        let imported = HybridKeyPair::import(&ExportedKeyPair::from_json(&json).unwrap()).unwrap();
        assert_eq!(imported.public_keys(), kp.public_keys());
        assert_eq!(imported.ec.private_key(), kp.ec.private_key());
        assert_eq!(imported.kem.private_key(), kp.kem.private_key());
    }

    #[test]
    fn test_import_rejects_mismatched_ec_halves() {
        let a = HybridKeyPair::generate_from_seed(&[4u8; 32]).unwrap();
        let b = HybridKeyPair::generate_from_seed(&[5u8; 32]).unwrap();
        let mut exported = a.export().unwrap();
        exported.ecc.public_key = b.export().unwrap().ecc.public_key.clone();
        assert_eq!(HybridKeyPair::import(&exported).unwrap_err(), Error::InvalidKeyMaterial);
    }

    #[test]
    fn test_import_rejects_unknown_version() {
        let kp = HybridKeyPair::generate_from_seed(&[6u8; 32]).unwrap();
        let mut exported = kp.export().unwrap();
        exported.version = "hybrid-v0".to_string();
        assert_eq!(
            HybridKeyPair::import(&exported).unwrap_err(),
            Error::UnsupportedVersion("hybrid-v0".to_string())
        );
    }

    #[test]
    fn test_public_keys_round_trip() {
        let kp = HybridKeyPair::generate_from_seed(&[7u8; 32]).unwrap();
        let json = kp.public_keys().export().unwrap().to_json().unwrap();
        assert!(!json.contains("private"));

        let imported = HybridPublicKeys::import(&ExportedPublicKeys::from_json(&json).unwrap()).unwrap();
        assert_eq!(imported, kp.public_keys());
    }

    #[test]
    fn test_public_keys_validation() {
        let kp = HybridKeyPair::generate_from_seed(&[8u8; 32]).unwrap();
        let public = kp.public_keys();

        assert_eq!(
            HybridPublicKeys::new(vec![4u8; 65], public.kem.clone()).unwrap_err(),
            Error::InvalidKeyMaterial
        );
        assert_eq!(
            HybridPublicKeys::new(public.ec.clone(), vec![0u8; 100]).unwrap_err(),
            Error::InvalidKeySize { expected: 1184, actual: 100 }
        );
    }

    #[test]
    fn test_exported_private_key_not_in_debug() {
        let kp = HybridKeyPair::generate_from_seed(&[9u8; 32]).unwrap();
        let exported = kp.export().unwrap();
        let printed = format!("{:?}", exported);
        assert!(!printed.contains(&exported.kyber.private_key));
        assert!(printed.contains("<redacted>"));
    }
}
