/// Post-quantum key encapsulation: ML-KEM-768 (NIST FIPS 203)
///
/// Key sizes:
/// - Encapsulation key (public):  1184 bytes
/// - Decapsulation key (secret):  2400 bytes
/// - Ciphertext:                  1088 bytes
/// - Shared secret:               32 bytes
///
/// A ciphertext decapsulated with the wrong private key does not fail; it
/// yields an unrelated secret (implicit rejection), which the AEAD tag check
/// downstream then catches.
use ml_kem::kem::{Decapsulate, DecapsulationKey, EncapsulationKey, Encapsulate};
use ml_kem::{Ciphertext, Encoded, EncodedSizeUser, KemCore, MlKem768, MlKem768Params};
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroizing;

use crate::crypto::{decode_b64, encode_b64, Algorithm, KeyPair};
use crate::entropy::EntropySource;
use crate::error::{Error, Result};

pub const PUBLIC_KEY_BYTES: usize = 1184;
pub const PRIVATE_KEY_BYTES: usize = 2400;
pub const CIPHERTEXT_BYTES: usize = 1088;
pub const SHARED_SECRET_BYTES: usize = 32;

/// Output of `encapsulate`: the ciphertext for the peer plus our copy of the
/// secret it carries.
pub struct Encapsulation {
    pub ciphertext: Vec<u8>,
    pub shared_secret: Zeroizing<[u8; SHARED_SECRET_BYTES]>,
}

/// Generate an ML-KEM-768 key pair from pool entropy.
pub async fn generate_keypair(entropy: &EntropySource) -> Result<KeyPair> {
    let mut rng = entropy.seeded_rng().await?;
    keypair_from_rng(&mut rng)
}

/// Generate an ML-KEM-768 key pair from a 32-byte seed (deterministic)
pub fn generate_keypair_from_seed(seed: &[u8; 32]) -> Result<KeyPair> {
    let mut rng = ChaCha20Rng::from_seed(*seed);
    keypair_from_rng(&mut rng)
}

fn keypair_from_rng(rng: &mut ChaCha20Rng) -> Result<KeyPair> {
    let (dk, ek) = MlKem768::generate(rng);
    KeyPair::new(
        Algorithm::MlKem768,
        ek.as_bytes().to_vec(),
        dk.as_bytes().to_vec(),
    )
}

/// Encapsulate a fresh secret to `peer_public_key`. Every call produces a
/// different ciphertext and secret.
pub fn encapsulate(peer_public_key: &[u8]) -> Result<Encapsulation> {
    if peer_public_key.len() != PUBLIC_KEY_BYTES {
        return Err(Error::InvalidKeySize {
            expected: PUBLIC_KEY_BYTES,
            actual: peer_public_key.len(),
        });
    }

    let encoded = Encoded::<EncapsulationKey<MlKem768Params>>::try_from(peer_public_key)
        .map_err(|_| Error::InvalidKeyMaterial)?;
    let ek = EncapsulationKey::<MlKem768Params>::from_bytes(&encoded);

    let (ct, ss) = ek
        .encapsulate(&mut OsRng)
        .map_err(|_| Error::InvalidKeyMaterial)?;

    let mut shared_secret = Zeroizing::new([0u8; SHARED_SECRET_BYTES]);
    shared_secret.copy_from_slice(ss.as_ref());

    Ok(Encapsulation {
        ciphertext: ct.iter().copied().collect(),
        shared_secret,
    })
}

/// Recover the secret carried by `ciphertext`.
pub fn decapsulate(
    ciphertext: &[u8],
    own_private_key: &[u8],
) -> Result<Zeroizing<[u8; SHARED_SECRET_BYTES]>> {
    if ciphertext.len() != CIPHERTEXT_BYTES {
        return Err(Error::InvalidCiphertextSize {
            expected: CIPHERTEXT_BYTES,
            actual: ciphertext.len(),
        });
    }
    if own_private_key.len() != PRIVATE_KEY_BYTES {
        return Err(Error::InvalidKeySize {
            expected: PRIVATE_KEY_BYTES,
            actual: own_private_key.len(),
        });
    }

    let encoded = Encoded::<DecapsulationKey<MlKem768Params>>::try_from(own_private_key)
        .map_err(|_| Error::InvalidKeyMaterial)?;
    let dk = DecapsulationKey::<MlKem768Params>::from_bytes(&encoded);

    let ct = Ciphertext::<MlKem768>::try_from(ciphertext).map_err(|_| Error::InvalidKeyMaterial)?;
    let ss = dk.decapsulate(&ct).map_err(|_| Error::InvalidKeyMaterial)?;

    let mut shared_secret = Zeroizing::new([0u8; SHARED_SECRET_BYTES]);
    shared_secret.copy_from_slice(ss.as_ref());
    Ok(shared_secret)
}

pub fn export_public_key(public_key: &[u8]) -> String {
    encode_b64(public_key)
}

pub fn import_public_key(encoded: &str) -> Result<Vec<u8>> {
    import_sized(encoded, PUBLIC_KEY_BYTES)
}

pub fn export_private_key(private_key: &[u8]) -> Zeroizing<String> {
    Zeroizing::new(encode_b64(private_key))
}

pub fn import_private_key(encoded: &str) -> Result<Zeroizing<Vec<u8>>> {
    import_sized(encoded, PRIVATE_KEY_BYTES).map(Zeroizing::new)
}

fn import_sized(encoded: &str, expected: usize) -> Result<Vec<u8>> {
    let bytes = decode_b64(encoded).ok_or(Error::InvalidKeyMaterial)?;
    if bytes.len() != expected {
        return Err(Error::InvalidKeySize {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}
