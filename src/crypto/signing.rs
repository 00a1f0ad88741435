/// Post-quantum signatures: ML-DSA-65 (NIST FIPS 204)
///
/// Sizes: public key 1952 bytes, private key 4032 bytes, signature 3309
/// bytes. Signing uses an empty context string.
use fips204::ml_dsa_65;
use fips204::traits::{SerDes, Signer, Verifier};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{decode_b64, encode_b64, Algorithm, KeyPair};
use crate::entropy::EntropySource;
use crate::error::{Error, Result};

pub const PUBLIC_KEY_BYTES: usize = 1952;
pub const PRIVATE_KEY_BYTES: usize = 4032;
pub const SIGNATURE_BYTES: usize = 3309;

const CONTEXT: &[u8] = &[];

/// Generate an ML-DSA-65 key pair from pool entropy.
pub async fn generate_keypair(entropy: &EntropySource) -> Result<KeyPair> {
    let mut rng = entropy.seeded_rng().await?;
    keypair_from_rng(&mut rng)
}

/// Deterministic key pair from a 32-byte seed
pub fn generate_keypair_from_seed(seed: &[u8; 32]) -> Result<KeyPair> {
    let mut rng = ChaCha20Rng::from_seed(*seed);
    keypair_from_rng(&mut rng)
}

fn keypair_from_rng(rng: &mut ChaCha20Rng) -> Result<KeyPair> {
    let (pk, sk) = ml_dsa_65::try_keygen_with_rng(rng).map_err(|e| {
        log::error!("ML-DSA-65 key generation failed: {}", e);
        Error::InvalidKeyMaterial
    })?;
    let mut sk_bytes = sk.into_bytes();
    let pair = KeyPair::new(Algorithm::MlDsa65, pk.into_bytes().to_vec(), sk_bytes.to_vec());
    sk_bytes.zeroize();
    pair
}

/// Sign `message` with a raw ML-DSA-65 private key.
pub fn sign(message: &[u8], private_key: &[u8]) -> Result<Vec<u8>> {
    let sk_bytes: Zeroizing<[u8; PRIVATE_KEY_BYTES]> = Zeroizing::new(
        private_key
            .try_into()
            .map_err(|_| Error::InvalidKeySize {
                expected: PRIVATE_KEY_BYTES,
                actual: private_key.len(),
            })?,
    );
    let sk = ml_dsa_65::PrivateKey::try_from_bytes(*sk_bytes).map_err(|_| Error::InvalidKeyMaterial)?;
    let signature = sk.try_sign(message, CONTEXT).map_err(|e| {
        log::error!("ML-DSA-65 signing failed: {}", e);
        Error::InvalidKeyMaterial
    })?;
    Ok(signature.to_vec())
}

/// Check `signature` over `message`. Malformed input of any kind is simply
/// an invalid signature.
pub fn verify(signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
    let Ok(pk_bytes) = <[u8; PUBLIC_KEY_BYTES]>::try_from(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; SIGNATURE_BYTES]>::try_from(signature) else {
        return false;
    };
    match ml_dsa_65::PublicKey::try_from_bytes(pk_bytes) {
        Ok(pk) => pk.verify(message, &sig_bytes, CONTEXT),
        Err(_) => false,
    }
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

pub fn export_signature(signature: &[u8]) -> String {
    encode_b64(signature)
}

/// Decode a base64 signature. Length is not checked here; `verify` rejects
/// wrong sizes by returning `false`.
pub fn import_signature(encoded: &str) -> Result<Vec<u8>> {
    decode_b64(encoded).ok_or(Error::InvalidKeyMaterial)
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
